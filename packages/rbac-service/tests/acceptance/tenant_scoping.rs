use rbac_domain::ids::GroupId;
use rbac_service::{ScopeEngine, SearchRequest};
use rbac_testkit::{EntityBuilder, World, group};

use super::{build_engine, for_group, for_user, ids, search};

const ROOT: u64 = 0;
const OWNER: u64 = 1;
const OTHER: u64 = 2;
const CHILD: u64 = 3;

const OWNER_GROUP: u64 = 10;
const OTHER_GROUP: u64 = 20;
const CHILD_GROUP: u64 = 30;
const ROOT_GROUP: u64 = 40;

const OWNER_USER: u64 = 100;
const OTHER_USER: u64 = 200;

// 0 -> (1, 2), 1 -> 3 where 3 is a project.
fn world() -> World {
	let mut world = World::new().expect("world");

	world.tenant(ROOT, None).expect("root tenant");
	world.tenant(OWNER, Some(ROOT)).expect("owner tenant");
	world.tenant(OTHER, Some(ROOT)).expect("other tenant");
	world.project(CHILD, OWNER).expect("child project");
	world.group(group(OWNER_GROUP, OWNER)).expect("owner group");
	world.group(group(OTHER_GROUP, OTHER)).expect("other group");
	world.group(group(CHILD_GROUP, CHILD)).expect("child group");
	world.group(group(ROOT_GROUP, ROOT)).expect("root group");
	world.user(OWNER_USER, OWNER_GROUP).expect("owner user");
	world.user(OTHER_USER, OTHER_GROUP).expect("other user");

	world
}

fn owned(kind: &str, tenant: u64) -> World {
	let mut world = world();

	world.entity(EntityBuilder::new(1, kind).tenant(tenant).build()).expect("owned row");

	world
}

#[test]
fn users_see_their_own_tenant_for_every_scoped_kind() {
	for kind in ["ManagementSystem", "RequestTask", "Service", "ServiceTemplate", "Vm"] {
		let engine = build_engine(owned(kind, OWNER));

		assert_eq!(ids(&search(&engine, for_user(kind, OWNER_USER))), vec![1], "{kind}");
		assert!(ids(&search(&engine, for_user(kind, OTHER_USER))).is_empty(), "{kind}");
	}
}

#[test]
fn groups_scope_like_their_members() {
	let engine = build_engine(owned("Vm", OWNER));

	assert_eq!(ids(&search(&engine, for_group("Vm", OWNER_GROUP))), vec![1]);
	assert!(ids(&search(&engine, for_group("Vm", OTHER_GROUP))).is_empty());
}

#[test]
fn an_explicit_group_replaces_the_users_current_group() {
	let engine = build_engine(owned("Vm", OWNER));
	let joining =
		SearchRequest { group_id: Some(GroupId(OWNER_GROUP)), ..for_user("Vm", OTHER_USER) };
	let leaving =
		SearchRequest { group_id: Some(GroupId(OTHER_GROUP)), ..for_user("Vm", OWNER_USER) };

	assert_eq!(ids(&search(&engine, joining)), vec![1]);
	assert!(ids(&search(&engine, leaving)).is_empty());
}

#[test]
fn descendant_strategy_looks_down_the_tree() {
	let parent_vm = build_engine(owned("Vm", OWNER));
	let child_vm = build_engine(owned("Vm", CHILD));

	assert!(ids(&search(&parent_vm, for_group("Vm", CHILD_GROUP))).is_empty());
	assert_eq!(ids(&search(&child_vm, for_group("Vm", OWNER_GROUP))), vec![1]);
}

#[test]
fn ancestor_strategy_looks_up_the_tree() {
	let parent_ems = build_engine(owned("ManagementSystem", OWNER));
	let child_ems = build_engine(owned("ManagementSystem", CHILD));

	assert_eq!(ids(&search(&parent_ems, for_group("ManagementSystem", CHILD_GROUP))), vec![1]);
	assert!(ids(&search(&child_ems, for_group("ManagementSystem", OWNER_GROUP))).is_empty());
}

#[test]
fn tenant_only_strategy_matches_exactly() {
	let owner_task = build_engine(owned("RequestTask", OWNER));
	let child_task = build_engine(owned("RequestTask", CHILD));

	assert_eq!(ids(&search(&owner_task, for_group("RequestTask", OWNER_GROUP))), vec![1]);
	assert!(ids(&search(&owner_task, for_group("RequestTask", CHILD_GROUP))).is_empty());
	assert!(ids(&search(&child_task, for_group("RequestTask", OWNER_GROUP))).is_empty());
}

#[test]
fn root_tenant_members_see_tenant_only_rows_everywhere() {
	let engine = build_engine(owned("RequestTask", OWNER));

	assert_eq!(ids(&search(&engine, for_group("RequestTask", ROOT_GROUP))), vec![1]);
}

#[test]
fn configured_strategies_override_the_catalog() {
	let mut cfg = rbac_testkit::sample_config();

	cfg.tenancy.strategies.insert("VmOrTemplate".to_string(), "tenant_only".to_string());

	let (kinds, repository, policies) = owned("Vm", CHILD).into_parts();
	let engine = ScopeEngine::new(cfg, kinds, repository, policies).expect("engine");

	assert!(ids(&search(&engine, for_group("Vm", OWNER_GROUP))).is_empty());
	assert_eq!(ids(&search(&engine, for_group("Vm", CHILD_GROUP))), vec![1]);
}

#[test]
fn unknown_requesters_see_nothing_but_keep_the_total() {
	let engine = build_engine(owned("Vm", OWNER));
	let response = search(&engine, for_user("Vm", 999));

	assert!(response.results.is_empty());
	assert_eq!((response.total_count, response.auth_count), (1, 0));
	assert!(response.effective_filters.is_empty());
}

#[test]
fn unknown_strategy_names_fail_engine_construction() {
	let mut cfg = rbac_testkit::sample_config();

	cfg.tenancy.strategies.insert("Vm".to_string(), "siblings".to_string());

	let (kinds, repository, policies) = world().into_parts();

	assert!(ScopeEngine::new(cfg, kinds, repository, policies).is_err());
}

#[test]
fn unknown_default_timezones_fail_engine_construction() {
	let mut cfg = rbac_testkit::sample_config();

	cfg.search.default_timezone = "Atlantis/Capital".to_string();

	let (kinds, repository, policies) = world().into_parts();
	let result = ScopeEngine::new(cfg, kinds, repository, policies);

	assert!(matches!(result, Err(rbac_service::Error::UnknownTimezone { .. })));
}
