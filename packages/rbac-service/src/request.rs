use serde::{Deserialize, Serialize};

use rbac_domain::{
	entity::Entity,
	ids::{EntityId, GroupId, UserId},
	policy::Policy,
};
use rbac_storage::models::SortKey;

use crate::{expression::Expression, scopes::NamedScopeRef};

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultsFormat {
	#[default]
	Objects,
	Ids,
}

/// Authorize through a dependent kind: a row is visible when some authorized row of `kind`
/// points at it.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct DescendantMatch {
	pub kind: String,
	/// The belongs-to association on `kind`; defaults to the first one that reaches the searched
	/// kind.
	#[serde(default)]
	pub association: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct SearchRequest {
	pub kind: String,
	/// Restricts the search to these ids and, unless `order` is given, returns them in this order.
	#[serde(default)]
	pub targets: Option<Vec<EntityId>>,
	#[serde(default)]
	pub filter: Option<Expression>,
	#[serde(default)]
	pub named_scope: Option<NamedScopeRef>,
	#[serde(default)]
	pub user_id: Option<UserId>,
	/// Takes precedence over the user's current group.
	#[serde(default)]
	pub group_id: Option<GroupId>,
	#[serde(default)]
	pub results_format: ResultsFormat,
	#[serde(default)]
	pub order: Vec<SortKey>,
	#[serde(default)]
	pub limit: Option<u64>,
	#[serde(default)]
	pub offset: u64,
	#[serde(default)]
	pub match_via_descendants: Option<DescendantMatch>,
}
impl SearchRequest {
	pub fn new(kind: impl Into<String>) -> Self {
		Self { kind: kind.into(), ..Self::default() }
	}
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SearchResults {
	Objects(Vec<Entity>),
	Ids(Vec<EntityId>),
}
impl SearchResults {
	pub fn len(&self) -> usize {
		match self {
			Self::Objects(rows) => rows.len(),
			Self::Ids(ids) => ids.len(),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn ids(&self) -> Vec<EntityId> {
		match self {
			Self::Objects(rows) => rows.iter().map(|row| row.id).collect(),
			Self::Ids(ids) => ids.clone(),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SearchResponse {
	pub results: SearchResults,
	/// Rows matching the kind, targets, filter, and named scope.
	pub total_count: u64,
	/// Of those, the rows the requester may see.
	pub auth_count: u64,
	pub effective_filters: Policy,
}
