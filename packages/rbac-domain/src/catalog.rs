//! The inventory kinds the engine ships with.

use crate::{
	Result,
	containment::ContainmentRole,
	kinds::{
		Association, Capabilities, Column, ColumnType, EntityKind, HasContainmentChain,
		HasOwnership, HasTags, HasTenant, KindRegistry, ParticipatesInRbac, RbacMode,
		VirtualColumn,
	},
	tenant::TenantStrategy,
};

pub struct ManagementSystem;
impl EntityKind for ManagementSystem {
	const NAME: &'static str = "ManagementSystem";
	const TABLE: &'static str = "ext_management_systems";

	fn capabilities() -> Capabilities {
		Capabilities::default()
			.tenant::<Self>()
			.tags::<Self>()
			.containment::<Self>()
			.rbac::<Self>()
	}

	fn columns() -> Vec<Column> {
		vec![
			Column::new("name", ColumnType::String),
			Column::new("hostname", ColumnType::String),
			Column::new("zone", ColumnType::String),
		]
	}

	fn associations() -> Vec<Association> {
		vec![
			Association::has_many("hosts", Host::NAME, "ems_id"),
			Association::has_many("vms", VmOrTemplate::NAME, "ems_id"),
		]
	}
}
impl HasTenant for ManagementSystem {
	const STRATEGY: TenantStrategy = TenantStrategy::Ancestors;
}
impl HasTags for ManagementSystem {}
impl HasContainmentChain for ManagementSystem {
	const ROLE: ContainmentRole = ContainmentRole::Root;
}
impl ParticipatesInRbac for ManagementSystem {
	const MODE: RbacMode = RbacMode::Direct;
}

pub struct Folder;
impl EntityKind for Folder {
	const NAME: &'static str = "Folder";
	const TABLE: &'static str = "folders";

	fn capabilities() -> Capabilities {
		Capabilities::default().tags::<Self>().containment::<Self>().rbac::<Self>()
	}

	fn columns() -> Vec<Column> {
		vec![Column::new("name", ColumnType::String), Column::new("is_datacenter", ColumnType::Boolean)]
	}
}
impl HasTags for Folder {}
impl HasContainmentChain for Folder {
	const ROLE: ContainmentRole = ContainmentRole::Member;
}
impl ParticipatesInRbac for Folder {
	const MODE: RbacMode = RbacMode::Direct;
}

pub struct Cluster;
impl EntityKind for Cluster {
	const NAME: &'static str = "Cluster";
	const TABLE: &'static str = "clusters";

	fn capabilities() -> Capabilities {
		Capabilities::default().tags::<Self>().containment::<Self>().rbac::<Self>()
	}

	fn columns() -> Vec<Column> {
		vec![Column::new("name", ColumnType::String)]
	}

	fn associations() -> Vec<Association> {
		vec![Association::has_many("hosts", Host::NAME, "cluster_id")]
	}
}
impl HasTags for Cluster {}
impl HasContainmentChain for Cluster {
	const ROLE: ContainmentRole = ContainmentRole::Member;
}
impl ParticipatesInRbac for Cluster {
	const MODE: RbacMode = RbacMode::Direct;
}

pub struct ResourcePool;
impl EntityKind for ResourcePool {
	const NAME: &'static str = "ResourcePool";
	const TABLE: &'static str = "resource_pools";

	fn capabilities() -> Capabilities {
		Capabilities::default().tags::<Self>().containment::<Self>().rbac::<Self>()
	}

	fn columns() -> Vec<Column> {
		vec![Column::new("name", ColumnType::String)]
	}
}
impl HasTags for ResourcePool {}
impl HasContainmentChain for ResourcePool {
	const ROLE: ContainmentRole = ContainmentRole::Member;
}
impl ParticipatesInRbac for ResourcePool {
	const MODE: RbacMode = RbacMode::Direct;
}

pub struct Host;
impl EntityKind for Host {
	const NAME: &'static str = "Host";
	const TABLE: &'static str = "hosts";

	fn capabilities() -> Capabilities {
		Capabilities::default().tags::<Self>().containment::<Self>().rbac::<Self>()
	}

	fn columns() -> Vec<Column> {
		vec![
			Column::new("name", ColumnType::String),
			Column::new("hostname", ColumnType::String),
			Column::new("ems_id", ColumnType::Integer),
			Column::new("cluster_id", ColumnType::Integer),
			Column::new("power_state", ColumnType::String),
		]
	}

	fn associations() -> Vec<Association> {
		vec![
			Association::belongs_to("ems", ManagementSystem::NAME, "ems_id"),
			Association::belongs_to("cluster", Cluster::NAME, "cluster_id"),
			Association::has_many("vms", VmOrTemplate::NAME, "host_id"),
			Association::has_many("metrics", HostPerformance::NAME, "resource_id"),
		]
	}
}
impl HasTags for Host {}
impl HasContainmentChain for Host {
	const ROLE: ContainmentRole = ContainmentRole::Member;
}
impl ParticipatesInRbac for Host {
	const MODE: RbacMode = RbacMode::Direct;
}

pub struct VmOrTemplate;
impl EntityKind for VmOrTemplate {
	const NAME: &'static str = "VmOrTemplate";
	const TABLE: &'static str = "vms";

	fn capabilities() -> Capabilities {
		Capabilities::default()
			.tenant::<Self>()
			.tags::<Self>()
			.containment::<Self>()
			.ownership::<Self>()
			.rbac::<Self>()
	}

	fn columns() -> Vec<Column> {
		vec![
			Column::new("name", ColumnType::String),
			Column::new("location", ColumnType::String),
			Column::new("host_id", ColumnType::Integer),
			Column::new("ems_id", ColumnType::Integer),
			Column::new("power_state", ColumnType::String),
			Column::new("connection_state", ColumnType::String),
			Column::new("last_scan_on", ColumnType::DateTime),
			Column::new("retires_on", ColumnType::Date),
		]
	}

	fn associations() -> Vec<Association> {
		vec![
			Association::belongs_to("host", Host::NAME, "host_id"),
			Association::belongs_to("ems", ManagementSystem::NAME, "ems_id"),
		]
	}

	fn virtual_columns() -> Vec<VirtualColumn> {
		vec![
			VirtualColumn::Alias { name: "host_name", associations: &["host"], column: "name" },
			VirtualColumn::Flag {
				name: "disconnected",
				column: "connection_state",
				equals: "disconnected",
			},
		]
	}
}
impl HasTenant for VmOrTemplate {
	const STRATEGY: TenantStrategy = TenantStrategy::Descendants;
}
impl HasTags for VmOrTemplate {}
impl HasContainmentChain for VmOrTemplate {
	const ROLE: ContainmentRole = ContainmentRole::Member;
}
impl HasOwnership for VmOrTemplate {}
impl ParticipatesInRbac for VmOrTemplate {
	const MODE: RbacMode = RbacMode::Direct;
}

pub struct Vm;
impl EntityKind for Vm {
	const BASE: Option<&'static str> = Some(VmOrTemplate::NAME);
	const NAME: &'static str = "Vm";
	const TABLE: &'static str = VmOrTemplate::TABLE;
}

pub struct Template;
impl EntityKind for Template {
	const BASE: Option<&'static str> = Some(VmOrTemplate::NAME);
	const NAME: &'static str = "Template";
	const TABLE: &'static str = VmOrTemplate::TABLE;
}

pub struct Service;
impl EntityKind for Service {
	const NAME: &'static str = "Service";
	const TABLE: &'static str = "services";

	fn capabilities() -> Capabilities {
		Capabilities::default().tenant::<Self>().tags::<Self>().ownership::<Self>().rbac::<Self>()
	}

	fn columns() -> Vec<Column> {
		vec![
			Column::new("name", ColumnType::String),
			Column::new("retired", ColumnType::Boolean),
			Column::new("retires_on", ColumnType::Date),
		]
	}
}
impl HasTenant for Service {
	const STRATEGY: TenantStrategy = TenantStrategy::Descendants;
}
impl HasTags for Service {}
impl HasOwnership for Service {}
impl ParticipatesInRbac for Service {
	const MODE: RbacMode = RbacMode::Direct;
}

pub struct ServiceTemplate;
impl EntityKind for ServiceTemplate {
	const NAME: &'static str = "ServiceTemplate";
	const TABLE: &'static str = "service_templates";

	fn capabilities() -> Capabilities {
		Capabilities::default().tenant::<Self>().tags::<Self>().rbac::<Self>()
	}

	fn columns() -> Vec<Column> {
		vec![Column::new("name", ColumnType::String)]
	}
}
impl HasTenant for ServiceTemplate {
	const STRATEGY: TenantStrategy = TenantStrategy::Ancestors;
}
impl HasTags for ServiceTemplate {}
impl ParticipatesInRbac for ServiceTemplate {
	const MODE: RbacMode = RbacMode::Direct;
}

pub struct RequestTask;
impl EntityKind for RequestTask {
	const NAME: &'static str = "RequestTask";
	const TABLE: &'static str = "request_tasks";

	fn capabilities() -> Capabilities {
		Capabilities::default().tenant::<Self>().rbac::<Self>()
	}

	fn columns() -> Vec<Column> {
		vec![
			Column::new("description", ColumnType::String),
			Column::new("state", ColumnType::String),
			Column::new("created_on", ColumnType::DateTime),
		]
	}
}
impl HasTenant for RequestTask {
	const STRATEGY: TenantStrategy = TenantStrategy::TenantOnly;
}
impl ParticipatesInRbac for RequestTask {
	const MODE: RbacMode = RbacMode::Direct;
}

/// Hourly host metric rollups, authorized through the host they describe.
pub struct HostPerformance;
impl EntityKind for HostPerformance {
	const NAME: &'static str = "HostPerformance";
	const TABLE: &'static str = "metric_rollups";

	fn capabilities() -> Capabilities {
		Capabilities::default().rbac::<Self>()
	}

	fn columns() -> Vec<Column> {
		vec![
			Column::new("resource_id", ColumnType::Integer),
			Column::new("timestamp", ColumnType::DateTime),
			Column::new("cpu_usage_rate_average", ColumnType::Float),
		]
	}

	fn associations() -> Vec<Association> {
		vec![Association::belongs_to("resource", Host::NAME, "resource_id")]
	}
}
impl ParticipatesInRbac for HostPerformance {
	const MODE: RbacMode = RbacMode::Associated { kind: Host::NAME, foreign_key: "resource_id" };
}

pub struct Event;
impl EntityKind for Event {
	const NAME: &'static str = "Event";
	const TABLE: &'static str = "event_streams";

	fn columns() -> Vec<Column> {
		vec![
			Column::new("event_type", ColumnType::String),
			Column::new("message", ColumnType::String),
			Column::new("timestamp", ColumnType::DateTime),
			Column::new("host_id", ColumnType::Integer),
		]
	}

	fn associations() -> Vec<Association> {
		vec![Association::belongs_to("host", Host::NAME, "host_id")]
	}
}

pub struct Group;
impl EntityKind for Group {
	const NAME: &'static str = "Group";
	const TABLE: &'static str = "groups";

	fn capabilities() -> Capabilities {
		Capabilities::default().rbac::<Self>()
	}

	fn columns() -> Vec<Column> {
		vec![Column::new("name", ColumnType::String), Column::new("description", ColumnType::String)]
	}

	fn associations() -> Vec<Association> {
		vec![
			Association::has_many("vms", VmOrTemplate::NAME, "group_id"),
			Association::has_many("users", User::NAME, "current_group_id"),
		]
	}
}
impl ParticipatesInRbac for Group {
	const MODE: RbacMode = RbacMode::UserGroup { column: "id" };
}

pub struct User;
impl EntityKind for User {
	const NAME: &'static str = "User";
	const TABLE: &'static str = "users";

	fn capabilities() -> Capabilities {
		Capabilities::default().rbac::<Self>()
	}

	fn columns() -> Vec<Column> {
		vec![
			Column::new("name", ColumnType::String),
			Column::new("userid", ColumnType::String),
			Column::new("current_group_id", ColumnType::Integer),
		]
	}

	fn associations() -> Vec<Association> {
		vec![Association::belongs_to("current_group", Group::NAME, "current_group_id")]
	}
}
impl ParticipatesInRbac for User {
	const MODE: RbacMode = RbacMode::UserGroup { column: "current_group_id" };
}

/// Registry of every built-in kind, bases before subkinds.
pub fn registry() -> Result<KindRegistry> {
	let mut registry = KindRegistry::new();

	registry.register::<ManagementSystem>()?;
	registry.register::<Folder>()?;
	registry.register::<Cluster>()?;
	registry.register::<ResourcePool>()?;
	registry.register::<Host>()?;
	registry.register::<VmOrTemplate>()?;
	registry.register::<Vm>()?;
	registry.register::<Template>()?;
	registry.register::<Service>()?;
	registry.register::<ServiceTemplate>()?;
	registry.register::<RequestTask>()?;
	registry.register::<HostPerformance>()?;
	registry.register::<Event>()?;
	registry.register::<Group>()?;
	registry.register::<User>()?;

	Ok(registry)
}
