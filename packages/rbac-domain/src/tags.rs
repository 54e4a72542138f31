use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::predicate::Predicate;

/// A managed-tag policy: an OR of AND-lists of tag paths such as `/managed/environment/prod`.
///
/// An empty policy places no restriction.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TagPolicy(Vec<Vec<String>>);
impl TagPolicy {
	pub fn new(groups: Vec<Vec<String>>) -> Self {
		Self(groups)
	}

	pub fn groups(&self) -> &[Vec<String>] {
		&self.0
	}

	pub fn is_unrestricted(&self) -> bool {
		self.0.is_empty()
	}

	pub fn matches(&self, tags: &BTreeSet<String>) -> bool {
		self.is_unrestricted()
			|| self.0.iter().any(|group| group.iter().all(|tag| tags.contains(tag)))
	}

	pub fn to_predicate(&self) -> Predicate {
		if self.is_unrestricted() {
			return Predicate::True;
		}

		Predicate::or(self.0.iter().map(|group| {
			Predicate::and(group.iter().map(|tag| Predicate::HasTag(tag.clone())))
		}))
	}
}
