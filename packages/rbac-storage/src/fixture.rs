//! JSON inventory snapshots loaded into the in-memory stores.

use std::collections::BTreeSet;

use serde::Deserialize;
use serde_json::{Map, Value};

use rbac_domain::{
	containment::ContainmentNode,
	entity::{AttrValue, Entity},
	ids::{EntityId, GroupId, NodeId, TenantId, UserId},
	kinds::KindRegistry,
	policy::{Group, User},
	tenant::Tenant,
};

use crate::{
	Error, Result,
	memory::{MemoryPolicyStore, MemoryRepository},
};

#[derive(Debug, Default, Deserialize)]
pub struct Fixture {
	#[serde(default)]
	pub tenants: Vec<Tenant>,
	#[serde(default)]
	pub groups: Vec<Group>,
	#[serde(default)]
	pub users: Vec<User>,
	#[serde(default)]
	pub containment: Vec<ContainmentNode>,
	#[serde(default)]
	pub entities: Vec<EntityRecord>,
}
impl Fixture {
	pub fn from_json(raw: &str) -> Result<Self> {
		Ok(serde_json::from_str(raw)?)
	}

	/// Builds both stores. Tenants and containment nodes must list parents before children.
	pub fn into_stores(
		self,
		kinds: KindRegistry,
	) -> Result<(MemoryRepository, MemoryPolicyStore)> {
		let tenant_count = self.tenants.len();
		let entity_count = self.entities.len();
		let mut policies = MemoryPolicyStore::new();

		for tenant in self.tenants {
			policies.insert_tenant(tenant)?;
		}
		for group in self.groups {
			policies.insert_group(group)?;
		}
		for user in self.users {
			policies.insert_user(user)?;
		}

		let mut repository = MemoryRepository::new(kinds);

		for node in self.containment {
			repository.insert_node(node)?;
		}
		for record in self.entities {
			let entity = record.into_entity(repository.kinds())?;

			repository.insert(entity)?;
		}

		tracing::debug!(tenants = tenant_count, entities = entity_count, "Fixture loaded.");

		Ok((repository, policies))
	}
}

/// An entity row as written in a fixture. Attribute values are typed by the kind's columns.
#[derive(Debug, Deserialize)]
pub struct EntityRecord {
	pub id: EntityId,
	pub kind: String,
	#[serde(default)]
	pub tenant_id: Option<TenantId>,
	#[serde(default)]
	pub owner_id: Option<UserId>,
	#[serde(default)]
	pub group_id: Option<GroupId>,
	#[serde(default)]
	pub containment_node: Option<NodeId>,
	#[serde(default)]
	pub tags: BTreeSet<String>,
	#[serde(default)]
	pub attributes: Map<String, Value>,
}
impl EntityRecord {
	pub fn into_entity(self, kinds: &KindRegistry) -> Result<Entity> {
		let kind = kinds.kind(&self.kind)?;
		let mut entity = Entity::new(self.id.0, self.kind.clone());

		entity.tenant_id = self.tenant_id;
		entity.owner_id = self.owner_id;
		entity.group_id = self.group_id;
		entity.containment_node = self.containment_node;
		entity.tags = self.tags;

		for (name, raw) in &self.attributes {
			let column = kind.column(name).ok_or_else(|| {
				Error::InvalidArgument(format!("{} has no column {name}.", self.kind))
			})?;
			let value = AttrValue::coerce(name, raw, column.column_type)?;

			entity.attributes.insert(name.clone(), value);
		}

		Ok(entity)
	}
}
