use serde_json::json;

use rbac_domain::ids::EntityId;
use rbac_service::{
	Expression, NamedScopeRef, NamedScopes, ResultsFormat, ScopeEngine, SearchRequest,
	SearchResults, scopes::single_arg,
};
use rbac_testkit::{EntityBuilder, World, group};

use super::{build_engine, for_group, for_user, ids, search, sorted_ids};

const GROUP: u64 = 10;
const USER: u64 = 100;
const TAGS: [&str; 4] = [
	"/managed/environment/prod",
	"/managed/environment/dev",
	"/managed/service_level/gold",
	"/managed/service_level/silver",
];

#[derive(Clone, Copy)]
enum Mode {
	Regular,
	SelfService,
	Limited,
}

fn people(mode: Mode) -> World {
	let mut world = World::new().expect("world");
	let mut requester_group = group(GROUP, 0);

	requester_group.self_service = matches!(mode, Mode::SelfService | Mode::Limited);
	requester_group.limited_self_service = matches!(mode, Mode::Limited);

	world.tenant(0, None).expect("root tenant");
	world.group(requester_group).expect("group");
	world.user(USER, GROUP).expect("user");

	world
}

// Services 1 and 2 are unowned, 3 belongs to the user, 4 to the group, 5 to both.
fn services(mode: Mode) -> ScopeEngine {
	let mut world = people(mode);

	for id in 1..=5 {
		let mut service = EntityBuilder::new(id, "Service").tenant(0).attr("name", "svc");

		if id == 3 || id == 5 {
			service = service.owner(USER);
		}
		if id == 4 || id == 5 {
			service = service.owning_group(GROUP);
		}

		world.entity(service.build()).expect("service");
	}

	build_engine(world)
}

// Four hosts, each with one VM. Even VMs belong to the user, odd ones to the group, and every VM
// but the first carries all four tags.
fn tagged_vms(mode: Mode) -> World {
	let mut world = people(mode);

	for i in 0..4_u64 {
		let host = i + 1;

		world
			.entity(
				EntityBuilder::new(host, "Host")
					.attr("name", format!("Host{host}").as_str())
					.attr("hostname", format!("host{host}.local").as_str())
					.build(),
			)
			.expect("host");

		let mut vm = EntityBuilder::new(i + 1, "Vm")
			.tenant(0)
			.attr("name", format!("Test Group {host} VM {i}").as_str())
			.attr("host_id", host as i64);

		vm = if i % 2 == 0 { vm.owner(USER) } else { vm.owning_group(GROUP) };

		if i > 0 {
			for tag in TAGS {
				vm = vm.tag(tag);
			}
		}

		world.entity(vm.build()).expect("vm");
	}

	world
}

fn vm_engine(mode: Mode) -> ScopeEngine {
	let mut scopes = NamedScopes::new();

	scopes.register("Vm", "group_scope", |args| {
		let number = single_arg("group_scope", args)?;

		Expression::field("Vm-name", "STARTS WITH", format!("Test Group {number}"))
	});

	build_engine(tagged_vms(mode)).with_scopes(scopes)
}

fn scoped(request: SearchRequest, number: u64) -> SearchRequest {
	SearchRequest {
		named_scope: Some(NamedScopeRef { name: "group_scope".to_string(), args: vec![json!(number)] }),
		..request
	}
}

#[test]
fn self_service_groups_see_group_owned_services() {
	let engine = services(Mode::SelfService);

	assert_eq!(sorted_ids(&search(&engine, for_group("Service", GROUP))), vec![4, 5]);
}

#[test]
fn self_service_users_add_their_own_services() {
	let engine = services(Mode::SelfService);

	assert_eq!(sorted_ids(&search(&engine, for_user("Service", USER))), vec![3, 4, 5]);
}

#[test]
fn limited_self_service_groups_still_see_group_owned_services() {
	let engine = services(Mode::Limited);

	assert_eq!(sorted_ids(&search(&engine, for_group("Service", GROUP))), vec![4, 5]);
}

#[test]
fn limited_self_service_users_see_only_their_own_services() {
	let engine = services(Mode::Limited);

	assert_eq!(sorted_ids(&search(&engine, for_user("Service", USER))), vec![3, 5]);
}

#[test]
fn limited_users_never_see_more_than_unlimited_ones() {
	let unlimited = ids(&search(&services(Mode::SelfService), for_user("Service", USER)));
	let limited = ids(&search(&services(Mode::Limited), for_user("Service", USER)));

	assert!(limited.iter().all(|id| unlimited.contains(id)));
}

#[test]
fn regular_groups_are_not_narrowed_by_ownership() {
	let engine = services(Mode::Regular);

	assert_eq!(search(&engine, for_user("Service", USER)).auth_count, 5);
}

#[test]
fn target_ids_come_back_as_objects_or_ids() {
	let engine = services(Mode::Regular);
	let targets: Vec<EntityId> = (1..=5).map(EntityId).collect();
	let as_objects = search(
		&engine,
		SearchRequest { targets: Some(targets.clone()), ..SearchRequest::new("Service") },
	);
	let as_ids = search(
		&engine,
		SearchRequest {
			targets: Some(targets),
			results_format: ResultsFormat::Ids,
			..SearchRequest::new("Service")
		},
	);

	assert!(matches!(&as_objects.results, SearchResults::Objects(rows) if rows.len() == 5));
	assert!(matches!(&as_ids.results, SearchResults::Ids(ids) if ids.len() == 5));
}

#[test]
fn self_service_vm_searches_follow_ownership() {
	assert_eq!(search(&vm_engine(Mode::SelfService), for_group("Vm", GROUP)).auth_count, 2);
	assert_eq!(search(&vm_engine(Mode::SelfService), for_user("Vm", USER)).auth_count, 4);
	assert_eq!(search(&vm_engine(Mode::Limited), for_group("Vm", GROUP)).auth_count, 2);
	assert_eq!(search(&vm_engine(Mode::Limited), for_user("Vm", USER)).auth_count, 2);
}

#[test]
fn named_scopes_combine_with_ownership() {
	let unlimited = vm_engine(Mode::SelfService);
	let limited = vm_engine(Mode::Limited);

	assert_eq!(ids(&search(&unlimited, scoped(for_user("Vm", USER), 1))), vec![1]);
	assert_eq!(ids(&search(&limited, scoped(for_user("Vm", USER), 1))), vec![1]);
	assert!(ids(&search(&limited, scoped(for_user("Vm", USER), 2))).is_empty());
}

#[test]
fn named_scopes_apply_to_system_searches() {
	let engine = vm_engine(Mode::Regular);

	assert_eq!(ids(&search(&engine, scoped(SearchRequest::new("Vm"), 4))), vec![4]);
	assert_eq!(search(&engine, SearchRequest::new("Vm")).auth_count, 4);
}

#[test]
fn unknown_named_scopes_are_errors() {
	let engine = vm_engine(Mode::Regular);
	let request = SearchRequest {
		named_scope: Some(NamedScopeRef { name: "missing".to_string(), args: Vec::new() }),
		..SearchRequest::new("Vm")
	};

	assert!(matches!(
		engine.search(&request),
		Err(rbac_service::Error::UnknownNamedScope { .. })
	));
}

#[test]
fn filters_mix_columns_and_virtual_columns() {
	let engine = vm_engine(Mode::Regular);
	let filter = Expression::parse(&json!({
		"or": [
			{ "STARTS WITH": { "field": "Vm-name", "value": "Test Group 1" } },
			{ "=": { "field": "Vm-host_name", "value": "Host2" } }
		]
	}))
	.expect("filter");
	let response = search(&engine, SearchRequest { filter: Some(filter), ..SearchRequest::new("Vm") });

	assert_eq!(sorted_ids(&response), vec![1, 2]);
}

#[test]
fn pages_after_tag_filters_with_association_columns() {
	let mut world = tagged_vms(Mode::Regular);
	let mut managed = group(11, 0);

	managed.policy = serde_json::from_value(json!({
		"managed": [["/managed/environment/prod"], ["/managed/service_level/silver"]],
		"belongsto": []
	}))
	.expect("policy");

	world.group(managed).expect("managed group");

	let engine = build_engine(world);
	let filter = Expression::parse(&json!({
		"and": [
			{ "IS NOT EMPTY": { "field": "Vm.host-name" } },
			{ "IS NOT EMPTY": { "field": "Vm-name" } }
		]
	}))
	.expect("filter");
	let response = search(
		&engine,
		SearchRequest {
			filter: Some(filter),
			order: vec![rbac_storage::models::SortKey::desc("name")],
			limit: Some(2),
			offset: 2,
			..for_group("Vm", 11)
		},
	);

	assert_eq!(super::names(&response), vec!["Test Group 2 VM 1".to_string()]);
	assert_eq!((response.total_count, response.auth_count), (4, 3));
	assert_eq!(response.effective_filters.managed.groups().len(), 2);
}
