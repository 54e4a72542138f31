use rbac_domain::{
	entity::AttrValue,
	ids::{GroupId, TenantId, UserId},
	kinds::ColumnType,
	policy::{Group, Policy, User},
	predicate::{CmpOp, FieldRef, Predicate},
};
use rbac_storage::PolicyStore;

use crate::Result;

/// Who a search runs for, resolved once per call and passed explicitly from there on.
#[derive(Clone, Debug)]
pub enum Requester {
	/// No identity was given. Policy filters do not apply.
	System,
	/// An identity was given but does not resolve to a group. Sees nothing.
	Unresolved { reason: String },
	Scoped(Box<RequesterScope>),
}
impl Requester {
	/// Resolves a user or group. When both are given, `group_id` replaces the user's current group.
	pub fn resolve(
		store: &dyn PolicyStore,
		user_id: Option<UserId>,
		group_id: Option<GroupId>,
	) -> Result<Self> {
		if user_id.is_none() && group_id.is_none() {
			return Ok(Self::System);
		}

		let user = match user_id {
			Some(id) => match store.user(id)? {
				Some(user) => Some(user),
				None => return Ok(Self::unresolved(format!("User {id} does not exist."))),
			},
			None => None,
		};
		let Some(group_id) = group_id.or_else(|| user.as_ref().and_then(User::current_group)) else {
			return Ok(Self::unresolved("Requester has no group.".to_string()));
		};
		let Some(group) = store.group(group_id)? else {
			return Ok(Self::unresolved(format!("Group {group_id} does not exist.")));
		};
		let Some(tenant) = store.tenant_of(group_id)? else {
			return Ok(Self::unresolved(format!("Group {group_id} has no tenant.")));
		};

		if store.tenants()?.get(tenant).is_none() {
			return Ok(Self::unresolved(format!("Tenant {tenant} does not exist.")));
		}

		let policy = store.effective_policy(group_id)?.unwrap_or_default();
		let self_service = store.is_self_service(group_id)?;
		let limited_self_service = store.is_limited_self_service(group_id)?;

		Ok(Self::Scoped(Box::new(RequesterScope {
			user,
			group,
			tenant,
			policy,
			self_service,
			limited_self_service,
		})))
	}

	fn unresolved(reason: String) -> Self {
		Self::Unresolved { reason }
	}

	/// The policy echoed back to callers. Empty unless the requester resolved.
	pub fn effective_filters(&self) -> Policy {
		match self {
			Self::Scoped(scope) => scope.policy.clone(),
			Self::System | Self::Unresolved { .. } => Policy::default(),
		}
	}

	pub fn timezone(&self) -> Option<&str> {
		match self {
			Self::Scoped(scope) => scope.user.as_ref().and_then(|user| user.timezone.as_deref()),
			Self::System | Self::Unresolved { .. } => None,
		}
	}
}

#[derive(Clone, Debug)]
pub struct RequesterScope {
	pub user: Option<User>,
	pub group: Group,
	pub tenant: TenantId,
	pub policy: Policy,
	pub self_service: bool,
	pub limited_self_service: bool,
}
impl RequesterScope {
	/// Rows a self-service requester owns. A user sees their own rows plus their group's, or only
	/// their own when limited; a bare group sees the group's rows.
	pub fn ownership(&self) -> Predicate {
		let group = owned_by("group_id", self.group.id.get());

		match &self.user {
			Some(user) if self.limited_self_service => owned_by("owner_id", user.id.get()),
			Some(user) => Predicate::or([owned_by("owner_id", user.id.get()), group]),
			None => group,
		}
	}
}

fn owned_by(column: &str, id: u64) -> Predicate {
	Predicate::compare(
		FieldRef::local(column, ColumnType::Integer),
		CmpOp::Eq,
		AttrValue::Integer(id as i64),
	)
}
