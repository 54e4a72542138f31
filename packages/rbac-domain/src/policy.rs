use serde::{Deserialize, Serialize};

use crate::{
	ids::{GroupId, TenantId, UserId},
	tags::TagPolicy,
};

/// A group's effective filters.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Policy {
	#[serde(default)]
	pub managed: TagPolicy,
	#[serde(default)]
	pub belongsto: Vec<String>,
}
impl Policy {
	pub fn is_empty(&self) -> bool {
		self.managed.is_unrestricted() && self.belongsto.is_empty()
	}
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Group {
	pub id: GroupId,
	pub name: String,
	pub tenant_id: TenantId,
	#[serde(default)]
	pub policy: Policy,
	#[serde(default)]
	pub self_service: bool,
	#[serde(default)]
	pub limited_self_service: bool,
	/// Super administrators see every group and user.
	#[serde(default)]
	pub super_admin: bool,
}
impl Group {
	/// Limited self-service implies self-service.
	pub fn is_self_service(&self) -> bool {
		self.self_service || self.limited_self_service
	}
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct User {
	pub id: UserId,
	pub name: String,
	#[serde(default)]
	pub group_ids: Vec<GroupId>,
	#[serde(default)]
	pub current_group: Option<GroupId>,
	/// Timezone name from the user's settings, IANA or display form.
	#[serde(default)]
	pub timezone: Option<String>,
}
impl User {
	/// The group the user acts through: the selected one, else the first membership.
	pub fn current_group(&self) -> Option<GroupId> {
		self.current_group.or_else(|| self.group_ids.first().copied())
	}
}
