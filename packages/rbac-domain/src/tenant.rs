use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{Error, Result, ids::TenantId, predicate::Predicate};

/// Which part of the tenant tree a requester sees for one entity kind.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantStrategy {
	Descendants,
	Ancestors,
	TenantOnly,
	None,
}
impl TenantStrategy {
	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"descendants" => Some(Self::Descendants),
			"ancestors" => Some(Self::Ancestors),
			"tenant_only" => Some(Self::TenantOnly),
			"none" => Some(Self::None),
			_ => None,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Descendants => "descendants",
			Self::Ancestors => "ancestors",
			Self::TenantOnly => "tenant_only",
			Self::None => "none",
		}
	}
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Tenant {
	pub id: TenantId,
	pub name: String,
	#[serde(default)]
	pub parent: Option<TenantId>,
	#[serde(default = "default_divisible")]
	pub divisible: bool,
}

/// Tenant ids visible to a requester.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TenantScope {
	All,
	Only(BTreeSet<TenantId>),
}
impl TenantScope {
	pub fn contains(&self, tenant: Option<TenantId>) -> bool {
		match self {
			Self::All => true,
			Self::Only(ids) => tenant.map(|id| ids.contains(&id)).unwrap_or(false),
		}
	}

	pub fn to_predicate(&self) -> Predicate {
		match self {
			Self::All => Predicate::True,
			Self::Only(ids) if ids.is_empty() => Predicate::False,
			Self::Only(ids) => Predicate::TenantIn(ids.clone()),
		}
	}
}

/// Arena of tenants keyed by id with parent back-references.
///
/// Parents must be inserted before their children, so the tree can never contain a cycle.
#[derive(Clone, Debug, Default)]
pub struct TenantTree {
	tenants: BTreeMap<TenantId, Tenant>,
	children: BTreeMap<TenantId, Vec<TenantId>>,
	root: Option<TenantId>,
}
impl TenantTree {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, tenant: Tenant) -> Result<()> {
		if self.tenants.contains_key(&tenant.id) {
			return Err(Error::InvalidTenantTree {
				message: format!("tenant {} is already defined.", tenant.id),
			});
		}

		match tenant.parent {
			None => {
				if let Some(root) = self.root {
					return Err(Error::InvalidTenantTree {
						message: format!(
							"tenant {} has no parent but tenant {root} is already the root.",
							tenant.id
						),
					});
				}

				self.root = Some(tenant.id);
			},
			Some(parent_id) => {
				let parent = self.tenants.get(&parent_id).ok_or_else(|| Error::InvalidTenantTree {
					message: format!("tenant {} references missing parent {parent_id}.", tenant.id),
				})?;

				if !parent.divisible {
					return Err(Error::InvalidTenantTree {
						message: format!(
							"tenant {} cannot be placed under project {parent_id}.",
							tenant.id
						),
					});
				}

				self.children.entry(parent_id).or_default().push(tenant.id);
			},
		}

		self.tenants.insert(tenant.id, tenant);

		Ok(())
	}

	pub fn get(&self, id: TenantId) -> Option<&Tenant> {
		self.tenants.get(&id)
	}

	pub fn root(&self) -> Option<TenantId> {
		self.root
	}

	pub fn len(&self) -> usize {
		self.tenants.len()
	}

	pub fn is_empty(&self) -> bool {
		self.tenants.is_empty()
	}

	/// The tenant itself followed by each ancestor up to the root. Empty for unknown ids.
	pub fn ancestors(&self, id: TenantId) -> Vec<TenantId> {
		let mut chain = Vec::new();
		let mut current = self.tenants.get(&id);

		while let Some(tenant) = current {
			chain.push(tenant.id);

			current = tenant.parent.and_then(|parent| self.tenants.get(&parent));
		}

		chain
	}

	/// The tenant itself and every tenant in its subtree. Empty for unknown ids.
	pub fn descendants(&self, id: TenantId) -> BTreeSet<TenantId> {
		let mut seen = BTreeSet::new();

		if !self.tenants.contains_key(&id) {
			return seen;
		}

		let mut stack = vec![id];

		while let Some(current) = stack.pop() {
			if !seen.insert(current) {
				continue;
			}
			if let Some(children) = self.children.get(&current) {
				stack.extend(children.iter().copied());
			}
		}

		seen
	}

	/// Tenants visible from `requester` under `strategy`.
	///
	/// Members of the root tenant (or of `root_tenant`, when configured differently) see every
	/// tenant under `tenant_only`. A requester outside the tree sees nothing.
	pub fn visible(
		&self,
		requester: TenantId,
		strategy: TenantStrategy,
		root_tenant: TenantId,
	) -> TenantScope {
		if strategy == TenantStrategy::None {
			return TenantScope::All;
		}
		if !self.tenants.contains_key(&requester) {
			return TenantScope::Only(BTreeSet::new());
		}

		match strategy {
			TenantStrategy::Descendants => TenantScope::Only(self.descendants(requester)),
			TenantStrategy::Ancestors =>
				TenantScope::Only(self.ancestors(requester).into_iter().collect()),
			TenantStrategy::TenantOnly
				if requester == root_tenant || self.root == Some(requester) =>
				TenantScope::All,
			TenantStrategy::TenantOnly => TenantScope::Only(BTreeSet::from([requester])),
			TenantStrategy::None => TenantScope::All,
		}
	}
}

fn default_divisible() -> bool {
	true
}
