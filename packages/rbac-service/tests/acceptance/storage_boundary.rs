use std::sync::{Arc, Mutex};

use serde_json::json;

use rbac_config::Config;
use rbac_domain::{
	containment::ContainmentTree, entity::Entity, ids::EntityId, kinds::KindDescriptor,
	predicate::Predicate,
};
use rbac_service::{Error, Expression, ScopeEngine, SearchRequest};
use rbac_storage::{Repository, memory::MemoryRepository, models::Page};
use rbac_testkit::{EntityBuilder, World, group};

use super::{for_user, ids, search};

/// Records every call and optionally fails them.
struct Recording {
	inner: MemoryRepository,
	calls: Mutex<Vec<&'static str>>,
	fail: bool,
}
impl Recording {
	fn record(&self, call: &'static str) -> rbac_storage::Result<()> {
		self.calls.lock().expect("calls lock").push(call);

		if self.fail {
			return Err(rbac_storage::Error::Unavailable("database is down".to_string()));
		}

		Ok(())
	}

	fn calls(&self) -> Vec<&'static str> {
		self.calls.lock().expect("calls lock").clone()
	}
}
impl Repository for Recording {
	fn count(&self, kind: &KindDescriptor, predicate: &Predicate) -> rbac_storage::Result<u64> {
		self.record("count")?;

		self.inner.count(kind, predicate)
	}

	fn fetch(
		&self,
		kind: &KindDescriptor,
		predicate: &Predicate,
		page: &Page,
	) -> rbac_storage::Result<Vec<Entity>> {
		self.record("fetch")?;

		self.inner.fetch(kind, predicate, page)
	}

	fn containment(&self) -> rbac_storage::Result<&ContainmentTree> {
		self.record("containment")?;

		self.inner.containment()
	}
}

const USER: u64 = 100;

// Services 1 through 5 in the root tenant, all but 1 tagged prod. The user's group only sees prod.
fn world() -> World {
	let mut world = World::new().expect("world");
	let mut prod_only = group(10, 0);

	prod_only.policy = serde_json::from_value(json!({ "managed": [["/managed/environment/prod"]] }))
		.expect("policy");

	world.tenant(0, None).expect("root tenant");
	world.group(prod_only).expect("group");
	world.user(USER, 10).expect("user");

	for id in 1..=5 {
		let mut service = EntityBuilder::new(id, "Service").tenant(0).attr("name", "svc");

		if id > 1 {
			service = service.tag("/managed/environment/prod");
		}

		world.entity(service.build()).expect("service");
	}

	world
}

fn recording_engine(fail: bool) -> (ScopeEngine, Arc<Recording>) {
	recording_engine_with(rbac_testkit::sample_config(), fail)
}

fn recording_engine_with(cfg: Config, fail: bool) -> (ScopeEngine, Arc<Recording>) {
	let (kinds, repository, policies) = world().into_parts();
	let recording = Arc::new(Recording {
		inner: Arc::unwrap_or_clone(repository),
		calls: Mutex::new(Vec::new()),
		fail,
	});
	let engine =
		ScopeEngine::new(cfg, kinds, Arc::clone(&recording) as Arc<dyn Repository>, policies)
			.expect("engine");

	(engine, recording)
}

fn services() -> Vec<Entity> {
	(1..=3).map(|id| EntityBuilder::new(id, "Service").tenant(0).build()).collect()
}

#[test]
fn empty_targets_never_reach_storage() {
	let (engine, recording) = recording_engine(true);
	let request = SearchRequest { targets: Some(Vec::new()), ..SearchRequest::new("Service") };
	let response = engine.search(&request).expect("empty targets");

	assert!(response.results.is_empty());
	assert_eq!((response.total_count, response.auth_count), (0, 0));
	assert!(recording.calls().is_empty());
}

#[test]
fn storage_failures_propagate() {
	let (engine, _) = recording_engine(true);
	let result = engine.search(&SearchRequest::new("Service"));

	assert!(matches!(result, Err(Error::Storage(rbac_storage::Error::Unavailable(_)))));
}

#[test]
fn nothing_is_fetched_when_nothing_is_authorized() {
	let (engine, recording) = recording_engine(false);
	let filter = Expression::field("Service-name", "=", "none").expect("filter");
	let response = search(&engine, SearchRequest { filter: Some(filter), ..SearchRequest::new("Service") });

	assert_eq!(response.auth_count, 0);
	assert!(!recording.calls().contains(&"fetch"));
}

#[test]
fn filtered_keeps_visible_objects_in_order() {
	let (engine, _) = recording_engine(false);
	let mut objects = services();

	objects.reverse();

	let visible = engine.filtered(&objects, &for_user("Service", USER)).expect("filtered");
	let ids: Vec<EntityId> = visible.iter().map(|object| object.id).collect();

	assert_eq!(ids, vec![EntityId(3), EntityId(2)]);
}

#[test]
fn filtered_ignores_paging() {
	let (engine, _) = recording_engine(false);
	let request = SearchRequest { limit: Some(1), offset: 1, ..for_user("Service", USER) };

	assert_eq!(engine.filtered(&services(), &request).expect("filtered").len(), 2);
}

#[test]
fn filtering_nothing_never_reaches_storage() {
	let (engine, recording) = recording_engine(true);

	assert!(engine.filtered(&[], &for_user("Service", USER)).expect("no objects").is_empty());
	assert!(recording.calls().is_empty());
}

#[test]
fn bad_expressions_fail_before_storage() {
	let (engine, recording) = recording_engine(true);
	let unknown_field = Expression::field("Service-flavor", "=", "x").expect("filter");
	let result =
		engine.search(&SearchRequest { filter: Some(unknown_field), ..SearchRequest::new("Service") });

	assert!(matches!(result, Err(Error::UnknownField { .. })));
	assert!(matches!(
		Expression::parse(&json!({ "LIKE": { "field": "Service-name", "value": "x" } })),
		Err(Error::MalformedExpression { .. })
	));
	assert!(recording.calls().is_empty());
}

#[test]
fn explicit_targets_page_in_requested_order() {
	let (engine, _) = recording_engine(false);
	let request = SearchRequest {
		targets: Some([5, 3, 4, 2].map(EntityId).to_vec()),
		limit: Some(2),
		offset: 2,
		..for_user("Service", USER)
	};
	let response = search(&engine, request);

	assert_eq!(ids(&response), vec![4, 2]);
	assert_eq!(response.auth_count, 4);
}

#[test]
fn explicit_targets_drop_missing_and_hidden_ids() {
	let (engine, _) = recording_engine(false);
	let request = SearchRequest {
		targets: Some([9, 3, 1, 2].map(EntityId).to_vec()),
		..for_user("Service", USER)
	};
	let response = search(&engine, request);

	assert_eq!(ids(&response), vec![3, 2]);
	assert_eq!((response.total_count, response.auth_count), (3, 2));
}

#[test]
fn target_lists_are_bounded() {
	let mut cfg = rbac_testkit::sample_config();

	cfg.search.max_targets = 2;

	let (engine, recording) = recording_engine_with(cfg, true);
	let request = SearchRequest {
		targets: Some((1..=3).map(EntityId).collect()),
		..SearchRequest::new("Service")
	};

	assert!(matches!(engine.search(&request), Err(Error::InvalidRequest { .. })));
	assert!(recording.calls().is_empty());
}
