use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

macro_rules! id_type {
	($(#[$meta:meta])* $name:ident) => {
		$(#[$meta])*
		#[derive(
			Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
		)]
		#[serde(transparent)]
		pub struct $name(pub u64);
		impl $name {
			pub fn get(self) -> u64 {
				self.0
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
				write!(f, "{}", self.0)
			}
		}
		impl From<u64> for $name {
			fn from(value: u64) -> Self {
				Self(value)
			}
		}
	};
}

id_type!(
	/// Primary key of an entity row, unique within its storage table.
	EntityId
);
id_type!(TenantId);
id_type!(GroupId);
id_type!(UserId);
id_type!(
	/// Arena key of a node in the structural containment tree.
	NodeId
);
