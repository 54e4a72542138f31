//! The storage boundary of the search engine.
//!
//! [`Repository`] executes composed predicates and [`PolicyStore`] answers who a requester is.
//! Both are read-only from the engine's point of view. The in-memory implementations in
//! [`memory`] are the reference semantics the SQL rendering in [`sql`] must agree with.

pub mod fixture;
pub mod memory;
pub mod models;
pub mod schema;
pub mod sql;

mod error;

pub use error::Error;

use rbac_domain::{
	containment::ContainmentTree,
	entity::Entity,
	ids::{GroupId, TenantId, UserId},
	kinds::KindDescriptor,
	policy::{Group, Policy, User},
	predicate::Predicate,
	tenant::TenantTree,
};

use crate::models::Page;

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub trait Repository
where
	Self: Send + Sync,
{
	/// Number of rows of `kind`'s table that satisfy `predicate`.
	fn count(&self, kind: &KindDescriptor, predicate: &Predicate) -> Result<u64>;

	/// Rows of `kind`'s table that satisfy `predicate`, ordered and sliced by `page`.
	fn fetch(
		&self,
		kind: &KindDescriptor,
		predicate: &Predicate,
		page: &Page,
	) -> Result<Vec<Entity>>;

	fn containment(&self) -> Result<&ContainmentTree>;
}

pub trait PolicyStore
where
	Self: Send + Sync,
{
	fn user(&self, id: UserId) -> Result<Option<User>>;

	fn group(&self, id: GroupId) -> Result<Option<Group>>;

	fn tenants(&self) -> Result<&TenantTree>;

	fn effective_policy(&self, group: GroupId) -> Result<Option<Policy>> {
		Ok(self.group(group)?.map(|group| group.policy))
	}

	fn tenant_of(&self, group: GroupId) -> Result<Option<TenantId>> {
		Ok(self.group(group)?.map(|group| group.tenant_id))
	}

	/// Unknown groups are not self-service.
	fn is_self_service(&self, group: GroupId) -> Result<bool> {
		Ok(self.group(group)?.map(|group| group.is_self_service()).unwrap_or(false))
	}

	fn is_limited_self_service(&self, group: GroupId) -> Result<bool> {
		Ok(self.group(group)?.map(|group| group.limited_self_service).unwrap_or(false))
	}
}
