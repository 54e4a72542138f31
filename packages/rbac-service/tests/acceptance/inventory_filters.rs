use serde_json::json;
use time::{Duration, OffsetDateTime, macros::datetime};

use rbac_domain::{entity::AttrValue, ids::EntityId, policy::Policy};
use rbac_service::{DescendantMatch, Expression, ScopeEngine, SearchRequest};
use rbac_testkit::{EntityBuilder, World, group};

use super::{build_engine, for_group, for_user, frozen_engine, names, objects, search, sorted_ids};

const PROD: &str = "/managed/environment/prod";
const SILVER: &str = "/managed/service_level/silver";
const GROUP: u64 = 10;
const USER: u64 = 100;

fn policy(raw: serde_json::Value) -> Policy {
	serde_json::from_value(raw).expect("policy")
}

fn tag_policy() -> Policy {
	policy(json!({ "managed": [[PROD], [SILVER]] }))
}

/// A root tenant with one group carrying `policy` and one member.
fn people(policy: Policy) -> World {
	let mut world = World::new().expect("world");
	let mut requester_group = group(GROUP, 0);

	requester_group.policy = policy;

	world.tenant(0, None).expect("root tenant");
	world.group(requester_group).expect("group");
	world.user(USER, GROUP).expect("user");

	world
}

// Seven hourly rollups for each of hosts 1 and 2.
fn add_rollups(world: &mut World) {
	let start = datetime!(2011-01-11 10:00 UTC);

	for host in [1_i64, 2] {
		for hour in 0..7 {
			let id = (host as u64 - 1) * 7 + hour + 1;

			world
				.entity(
					EntityBuilder::new(id, "HostPerformance")
						.attr("resource_id", host)
						.time("timestamp", start + Duration::hours(hour as i64))
						.build(),
				)
				.expect("rollup");
		}
	}
}

fn resource_ids(engine: &ScopeEngine, request: SearchRequest) -> Vec<i64> {
	let response = search(engine, request);

	objects(&response)
		.iter()
		.filter_map(|row| row.attributes.get("resource_id").and_then(AttrValue::as_i64))
		.collect()
}

mod rollups {
	use super::*;

	fn tagged_hosts(policy: Policy) -> World {
		let mut world = people(policy);

		world
			.entity(EntityBuilder::new(1, "Host").attr("name", "host1").tag(PROD).tag(SILVER).build())
			.expect("host1");
		world.entity(EntityBuilder::new(2, "Host").attr("name", "host2").tag(PROD).build()).expect("host2");

		add_rollups(&mut world);

		world
	}

	#[test]
	fn rollups_follow_their_hosts_tags() {
		let engine = build_engine(tagged_hosts(tag_policy()));
		let response = search(&engine, for_user("HostPerformance", USER));

		assert_eq!((response.total_count, response.auth_count), (14, 7));
		assert_eq!(response.effective_filters, tag_policy());
		assert!(resource_ids(&engine, for_user("HostPerformance", USER)).iter().all(|id| *id == 1));
	}

	#[test]
	fn rollups_follow_their_hosts_tags_for_explicit_targets() {
		let engine = build_engine(tagged_hosts(tag_policy()));
		let request = SearchRequest {
			targets: Some((1..=14).map(EntityId).collect()),
			..for_user("HostPerformance", USER)
		};
		let response = search(&engine, request.clone());

		assert_eq!((response.total_count, response.auth_count), (14, 7));
		assert_eq!(resource_ids(&engine, request), vec![1; 7]);
	}

	#[test]
	fn rollups_match_through_descendant_vms() {
		let mut world = tagged_hosts(tag_policy());

		world
			.entity(
				EntityBuilder::new(1, "Vm")
					.tenant(0)
					.attr("name", "vm on host2")
					.attr("host_id", 2_i64)
					.tag(PROD)
					.tag(SILVER)
					.build(),
			)
			.expect("vm");

		let engine = build_engine(world);

		for descendants in [
			DescendantMatch { kind: "VmOrTemplate".to_string(), association: Some("host".to_string()) },
			DescendantMatch { kind: "Vm".to_string(), association: None },
		] {
			let request = SearchRequest {
				match_via_descendants: Some(descendants),
				..for_user("HostPerformance", USER)
			};
			let response = search(&engine, request.clone());

			assert_eq!(response.auth_count, 7);
			assert_eq!(resource_ids(&engine, request), vec![2; 7]);
		}
	}

	#[test]
	fn rollups_follow_their_hosts_placement() {
		let belongsto = policy(json!({ "belongsto": ["/belongsto/ManagementSystem|ems1"] }));
		let mut world = people(belongsto.clone());

		world.node(1, "ManagementSystem", "ems1", None).expect("ems");
		world.node(2, "Folder", "Datacenters", Some(1)).expect("datacenters");
		world.node(3, "Folder", "Datacenter1", Some(2)).expect("datacenter");
		world.node(4, "Folder", "host", Some(3)).expect("host folder");
		world.node(5, "Host", "host1", Some(4)).expect("host node");
		world.entity(EntityBuilder::new(1, "Host").attr("name", "host1").node(5).build()).expect("host1");
		world.entity(EntityBuilder::new(2, "Host").attr("name", "host2").build()).expect("host2");

		add_rollups(&mut world);

		let engine = build_engine(world);
		let response = search(&engine, for_user("HostPerformance", USER));

		assert_eq!(response.auth_count, 7);
		assert_eq!(response.effective_filters, belongsto);
		assert_eq!(resource_ids(&engine, for_user("HostPerformance", USER)), vec![1; 7]);
	}
}

mod management_systems {
	use super::*;

	#[test]
	fn target_order_is_preserved() {
		let mut world = people(Policy::default());

		for (id, name) in [(1, "ems"), (2, "ems2"), (3, "ems3"), (4, "ems4")] {
			world
				.entity(EntityBuilder::new(id, "ManagementSystem").tenant(0).attr("name", name).build())
				.expect("ems");
		}

		let engine = build_engine(world);
		let request = SearchRequest {
			targets: Some([2, 4, 3, 1].into_iter().map(EntityId).collect()),
			..SearchRequest::new("ManagementSystem")
		};

		assert_eq!(names(&search(&engine, request)), vec!["ems2", "ems4", "ems3", "ems"]);
	}

	#[test]
	fn roots_above_a_filtered_folder_stay_visible() {
		let vm_folder =
			"/belongsto/ManagementSystem|ems/Folder|Datacenters/Folder|Datacenter1/Folder|vm";
		let mut world = people(policy(json!({ "belongsto": [vm_folder] })));

		world.node(1, "ManagementSystem", "ems", None).expect("ems");
		world.node(2, "Folder", "Datacenters", Some(1)).expect("datacenters");
		world.node(3, "Folder", "Datacenter1", Some(2)).expect("datacenter");
		world.node(4, "Folder", "vm", Some(3)).expect("vm folder");
		world.node(10, "ManagementSystem", "ems2", None).expect("ems2");

		for (id, node) in [(1, 1), (2, 10)] {
			world
				.entity(EntityBuilder::new(id, "ManagementSystem").tenant(0).node(node).build())
				.expect("ems");
		}

		let engine = build_engine(world);

		assert_eq!(sorted_ids(&search(&engine, for_user("ManagementSystem", USER))), vec![1]);
		assert_eq!(sorted_ids(&search(&engine, SearchRequest::new("ManagementSystem"))), vec![1, 2]);
	}
}

mod clusters {
	use super::*;

	const CLUSTER: &str = "/belongsto/ManagementSystem|ems/Folder|Datacenters/Folder|MTC/Folder|host/Cluster|MTC Development";
	const DATACENTER: &str = "/belongsto/ManagementSystem|ems/Folder|Datacenters/Folder|MTC";
	const EMS: &str = "/belongsto/ManagementSystem|ems";

	// ems / Datacenters / MTC / host / MTC Development, holding Host_1 and a resource pool.
	// Host_2 and the two outer hosts sit outside the tree.
	fn world(belongsto: &[&str], placed_vms: bool) -> World {
		let mut world = people(policy(json!({ "belongsto": belongsto })));

		world.node(1, "ManagementSystem", "ems", None).expect("ems");
		world.node(2, "Folder", "Datacenters", Some(1)).expect("datacenters");
		world.node(3, "Folder", "MTC", Some(2)).expect("datacenter");
		world.node(4, "Folder", "host", Some(3)).expect("host folder");
		world.node(5, "Cluster", "MTC Development", Some(4)).expect("cluster");
		world.node(6, "ResourcePool", "Default for Cluster", Some(5)).expect("resource pool");
		world.node(7, "Host", "Host_1", Some(5)).expect("host node");
		world.entity(EntityBuilder::new(1, "Host").attr("name", "Host_1").node(7).build()).expect("host");

		for (id, name) in [(2, "Host_2"), (3, "Host_3"), (4, "Host_4")] {
			world.entity(EntityBuilder::new(id, "Host").attr("name", name).build()).expect("host");
		}

		for (id, kind, name) in
			[(1, "Vm", "vm1"), (2, "Template", "template1"), (3, "Vm", "vm2"), (4, "Template", "template2")]
		{
			let mut row = EntityBuilder::new(id, kind).tenant(0).attr("name", name);

			if placed_vms && id <= 2 {
				row = row.node(6);
			}

			world.entity(row.build()).expect("vm or template");
		}

		world
	}

	fn counts(engine: &ScopeEngine, kind: &str) -> (u64, u64) {
		let response = search(engine, for_group(kind, GROUP));

		(response.auth_count, response.total_count)
	}

	#[test]
	fn hosts_inside_a_filtered_path_are_visible() {
		for path in [CLUSTER, DATACENTER, EMS] {
			let engine = build_engine(world(&[path], false));

			assert_eq!(counts(&engine, "Host"), (1, 4), "{path}");
		}
	}

	#[test]
	fn unplaced_vms_are_hidden_by_a_cluster_path() {
		let engine = build_engine(world(&[CLUSTER], false));

		assert_eq!(counts(&engine, "VmOrTemplate"), (0, 4));
	}

	#[test]
	fn vms_in_the_clusters_resource_pool_are_visible() {
		let engine = build_engine(world(&[CLUSTER], true));

		assert_eq!(counts(&engine, "VmOrTemplate"), (2, 4));
	}

	#[test]
	fn no_belongsto_filter_shows_everything() {
		let engine = build_engine(world(&[], true));

		assert_eq!(counts(&engine, "Host"), (4, 4));
		assert_eq!(counts(&engine, "Vm"), (2, 2));
		assert_eq!(counts(&engine, "VmOrTemplate"), (4, 4));
	}
}

mod groups {
	use super::*;

	fn world() -> World {
		let mut world = people(Policy::default());

		for id in [1, 2] {
			world
				.entity(EntityBuilder::new(id, "Group").attr("name", format!("group {id}").as_str()).build())
				.expect("group row");
		}

		for (id, owner, state) in [(1, 1, "connected"), (2, 2, "connected"), (3, 2, "disconnected")] {
			world
				.entity(
					EntityBuilder::new(id, "Vm")
						.tenant(0)
						.owning_group(owner)
						.attr("connection_state", state)
						.build(),
				)
				.expect("vm");
		}

		world
	}

	#[test]
	fn contains_matches_any_related_row() {
		let engine = build_engine(world());
		let filter = Expression::field("Group.vms-connection_state", "CONTAINS", "connected")
			.expect("filter");
		let response =
			search(&engine, SearchRequest { filter: Some(filter), ..SearchRequest::new("Group") });

		assert_eq!((response.auth_count, response.total_count), (2, 2));
	}

	#[test]
	fn contains_on_a_flag_matches_any_related_row() {
		let engine = build_engine(world());
		let filter = Expression::field("Group.vms-disconnected", "CONTAINS", false).expect("filter");
		let response =
			search(&engine, SearchRequest { filter: Some(filter), ..SearchRequest::new("Group") });

		assert_eq!(sorted_ids(&response), vec![1, 2]);
	}
}

mod events {
	use super::*;

	const NOW: OffsetDateTime = datetime!(2011-01-11 17:30 UTC);

	#[test]
	fn kinds_without_rbac_ignore_policies_but_echo_them() {
		let mut world = people(tag_policy());

		for (id, at) in [(1, NOW), (2, NOW - Duration::hours(3)), (3, NOW - Duration::days(1))] {
			world
				.entity(
					EntityBuilder::new(id, "Event")
						.attr("event_type", "vm_power_on")
						.time("timestamp", at)
						.build(),
				)
				.expect("event");
		}

		let engine = frozen_engine(world, NOW);
		let filter = Expression::field("Event-timestamp", "IS", "Today").expect("filter");
		let response =
			search(&engine, SearchRequest { filter: Some(filter), ..for_user("Event", USER) });

		assert_eq!(sorted_ids(&response), vec![1, 2]);
		assert_eq!(response.auth_count, 2);
		assert_eq!(response.effective_filters, tag_policy());
	}
}
