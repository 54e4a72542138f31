//! Turning authorized rows into a response: target ordering, in-memory paging, and formatting.

use std::collections::BTreeMap;

use rbac_domain::{entity::Entity, ids::EntityId, policy::Policy};

use crate::request::{ResultsFormat, SearchResponse, SearchResults};

pub struct ResultAssembler {
	pub format: ResultsFormat,
	pub effective_filters: Policy,
}
impl ResultAssembler {
	pub fn new(format: ResultsFormat, effective_filters: Policy) -> Self {
		Self { format, effective_filters }
	}

	pub fn empty(self) -> SearchResponse {
		self.assemble(Vec::new(), 0, 0)
	}

	pub fn assemble(self, rows: Vec<Entity>, total_count: u64, auth_count: u64) -> SearchResponse {
		SearchResponse {
			results: format(rows, self.format),
			total_count,
			auth_count,
			effective_filters: self.effective_filters,
		}
	}
}

/// Reorders `rows` to follow `targets`. Rows whose id is not a target are dropped; repeated
/// targets yield the row once, at its first position.
pub fn order_by_targets(rows: Vec<Entity>, targets: &[EntityId]) -> Vec<Entity> {
	let mut by_id: BTreeMap<EntityId, Entity> = rows.into_iter().map(|row| (row.id, row)).collect();

	targets.iter().filter_map(|id| by_id.remove(id)).collect()
}

pub fn paginate(rows: Vec<Entity>, offset: u64, limit: Option<u64>) -> Vec<Entity> {
	let offset = usize::try_from(offset).unwrap_or(usize::MAX);
	let limit = limit.and_then(|limit| usize::try_from(limit).ok()).unwrap_or(usize::MAX);

	rows.into_iter().skip(offset).take(limit).collect()
}

pub fn format(rows: Vec<Entity>, format: ResultsFormat) -> SearchResults {
	match format {
		ResultsFormat::Objects => SearchResults::Objects(rows),
		ResultsFormat::Ids => SearchResults::Ids(rows.into_iter().map(|row| row.id).collect()),
	}
}
