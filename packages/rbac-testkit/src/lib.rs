//! In-memory inventories for tests: tenants, groups, users, containment nodes, and entity rows
//! behind the real `Repository` and `PolicyStore` boundary.

mod error;

pub use error::{Error, Result};

use std::{collections::BTreeMap, sync::Arc};

use serde_json::Value;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use rbac_config::{Config, Search, Service, Tenancy};
use rbac_domain::{
	catalog,
	containment::ContainmentNode,
	entity::{AttrValue, Entity},
	ids::{GroupId, NodeId, TenantId, UserId},
	kinds::{ColumnType, KindRegistry},
	policy::{Group, Policy, User},
	tenant::Tenant,
};
use rbac_storage::{
	fixture::Fixture,
	memory::{MemoryPolicyStore, MemoryRepository},
};

pub struct World {
	kinds: KindRegistry,
	repository: MemoryRepository,
	policies: MemoryPolicyStore,
}
impl World {
	/// An empty world over the built-in kind catalog.
	pub fn new() -> Result<Self> {
		let kinds = catalog::registry()?;

		Ok(Self {
			repository: MemoryRepository::new(kinds.clone()),
			policies: MemoryPolicyStore::new(),
			kinds,
		})
	}

	pub fn from_fixture(raw: &str) -> Result<Self> {
		let kinds = catalog::registry()?;
		let (repository, policies) = Fixture::from_json(raw)?.into_stores(kinds.clone())?;

		Ok(Self { kinds, repository, policies })
	}

	pub fn kinds(&self) -> &KindRegistry {
		&self.kinds
	}

	pub fn tenant(&mut self, id: u64, parent: Option<u64>) -> Result<&mut Self> {
		self.policies.insert_tenant(Tenant {
			id: TenantId(id),
			name: format!("tenant {id}"),
			parent: parent.map(TenantId),
			divisible: true,
		})?;

		Ok(self)
	}

	/// A tenant that cannot hold child tenants.
	pub fn project(&mut self, id: u64, parent: u64) -> Result<&mut Self> {
		self.policies.insert_tenant(Tenant {
			id: TenantId(id),
			name: format!("project {id}"),
			parent: Some(TenantId(parent)),
			divisible: false,
		})?;

		Ok(self)
	}

	pub fn group(&mut self, group: Group) -> Result<&mut Self> {
		self.policies.insert_group(group)?;

		Ok(self)
	}

	pub fn user(&mut self, id: u64, group: u64) -> Result<&mut Self> {
		self.user_with(user(id, group))
	}

	pub fn user_with(&mut self, user: User) -> Result<&mut Self> {
		self.policies.insert_user(user)?;

		Ok(self)
	}

	pub fn node(
		&mut self,
		id: u64,
		kind: &str,
		name: &str,
		parent: Option<u64>,
	) -> Result<&mut Self> {
		self.repository.insert_node(ContainmentNode {
			id: NodeId(id),
			kind: kind.to_string(),
			name: name.to_string(),
			parent: parent.map(NodeId),
		})?;

		Ok(self)
	}

	/// Adds a row after checking each attribute against the kind's columns.
	pub fn entity(&mut self, entity: Entity) -> Result<&mut Self> {
		let kind = self.kinds.kind(&entity.kind)?;

		for (name, value) in &entity.attributes {
			let column = kind.column(name).ok_or_else(|| {
				Error::Message(format!("{} has no column {name}.", entity.kind))
			})?;

			if !value.is_null() && !fits(value, column.column_type) {
				return Err(Error::Message(format!(
					"{}.{name} does not hold a {:?} value.",
					entity.kind, column.column_type
				)));
			}
		}

		self.repository.insert(entity)?;

		Ok(self)
	}

	pub fn repository(&self) -> &MemoryRepository {
		&self.repository
	}

	pub fn policies(&self) -> &MemoryPolicyStore {
		&self.policies
	}

	pub fn into_parts(self) -> (KindRegistry, Arc<MemoryRepository>, Arc<MemoryPolicyStore>) {
		(self.kinds, Arc::new(self.repository), Arc::new(self.policies))
	}
}

/// Builds entity rows field by field.
#[derive(Clone, Debug)]
pub struct EntityBuilder {
	entity: Entity,
}
impl EntityBuilder {
	pub fn new(id: u64, kind: &str) -> Self {
		Self { entity: Entity::new(id, kind) }
	}

	pub fn tenant(mut self, id: u64) -> Self {
		self.entity.tenant_id = Some(TenantId(id));

		self
	}

	pub fn owner(mut self, id: u64) -> Self {
		self.entity.owner_id = Some(UserId(id));

		self
	}

	pub fn owning_group(mut self, id: u64) -> Self {
		self.entity.group_id = Some(GroupId(id));

		self
	}

	pub fn node(mut self, id: u64) -> Self {
		self.entity.containment_node = Some(NodeId(id));

		self
	}

	pub fn tag(mut self, tag: &str) -> Self {
		self.entity.tags.insert(tag.to_string());

		self
	}

	pub fn attr(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
		self.entity.attributes.insert(name.to_string(), value.into());

		self
	}

	pub fn time(self, name: &str, value: OffsetDateTime) -> Self {
		self.attr(name, AttrValue::DateTime(value))
	}

	/// Sets a column from its JSON form, typed by `column_type` as fixtures are.
	pub fn json(mut self, name: &str, raw: &Value, kinds: &KindRegistry) -> Result<Self> {
		let kind = kinds.kind(&self.entity.kind)?;
		let column = kind.column(name).ok_or_else(|| {
			Error::Message(format!("{} has no column {name}.", self.entity.kind))
		})?;

		self.entity
			.attributes
			.insert(name.to_string(), AttrValue::coerce(name, raw, column.column_type)?);

		Ok(self)
	}

	pub fn build(self) -> Entity {
		self.entity
	}
}

/// A plain group in `tenant` with no filters.
pub fn group(id: u64, tenant: u64) -> Group {
	Group {
		id: GroupId(id),
		name: format!("group {id}"),
		tenant_id: TenantId(tenant),
		policy: Policy::default(),
		self_service: false,
		limited_self_service: false,
		super_admin: false,
	}
}

pub fn user(id: u64, group: u64) -> User {
	User {
		id: UserId(id),
		name: format!("user {id}"),
		group_ids: vec![GroupId(group)],
		current_group: None,
		timezone: None,
	}
}

pub fn timestamp(raw: &str) -> Result<OffsetDateTime> {
	OffsetDateTime::parse(raw, &Rfc3339)
		.map_err(|err| Error::Message(format!("{raw} is not an RFC 3339 timestamp: {err}.")))
}

/// The configuration tests start from: UTC, Monday weeks, root tenant 0.
pub fn sample_config() -> Config {
	Config {
		service: Service { log_level: "info".to_string() },
		search: Search {
			default_timezone: "UTC".to_string(),
			week_start: "monday".to_string(),
			max_expression_depth: 16,
			max_expression_nodes: 256,
			max_targets: 10_000,
		},
		tenancy: Tenancy {
			root_tenant_id: 0,
			strategies: BTreeMap::from([("RequestTask".to_string(), "tenant_only".to_string())]),
		},
	}
}

fn fits(value: &AttrValue, column_type: ColumnType) -> bool {
	matches!(
		(value, column_type),
		(AttrValue::String(_), ColumnType::String)
			| (AttrValue::Integer(_), ColumnType::Integer | ColumnType::Float)
			| (AttrValue::Float(_), ColumnType::Float)
			| (AttrValue::Boolean(_), ColumnType::Boolean)
			| (AttrValue::Date(_), ColumnType::Date)
			| (AttrValue::DateTime(_), ColumnType::DateTime)
	)
}
