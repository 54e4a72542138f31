use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
	#[default]
	Asc,
	Desc,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SortKey {
	pub column: String,
	#[serde(default)]
	pub direction: Direction,
}
impl SortKey {
	pub fn asc(column: impl Into<String>) -> Self {
		Self { column: column.into(), direction: Direction::Asc }
	}

	pub fn desc(column: impl Into<String>) -> Self {
		Self { column: column.into(), direction: Direction::Desc }
	}
}

/// Ordering and slicing for a fetch. Ascending keys sort nulls last, descending keys nulls
/// first; ties fall back to ascending id.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Page {
	pub order: Vec<SortKey>,
	pub limit: Option<u64>,
	pub offset: u64,
}
impl Page {
	pub fn all() -> Self {
		Self::default()
	}
}
