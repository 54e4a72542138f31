//! Structural containment: the tree of management systems, folders, clusters, and hosts that
//! places entities independently of tenancy, and the `belongsto` path filters evaluated over it.

use std::{
	collections::{BTreeMap, BTreeSet},
	fmt::{Display, Formatter},
};

use serde::{Deserialize, Serialize};

use crate::{Error, Result, ids::NodeId, predicate::Predicate};

pub const BELONGSTO_PREFIX: &str = "/belongsto";

/// How a kind relates to containment filters.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainmentRole {
	/// Tops a containment chain; visible when a filtered path runs through or below it.
	Root,
	/// Sits inside a chain; visible at or below a filtered path.
	Member,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PathSegment {
	pub kind: String,
	pub name: String,
}

/// A chain of `Kind|name` segments from a containment root downwards.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ContainmentPath {
	segments: Vec<PathSegment>,
}
impl ContainmentPath {
	/// Parses `/belongsto/Kind|name/Kind|name/...`. The `/belongsto` prefix is optional.
	pub fn parse(raw: &str) -> Option<Self> {
		let trimmed = raw.trim();
		let body = trimmed.strip_prefix(BELONGSTO_PREFIX).unwrap_or(trimmed);
		let mut segments = Vec::new();

		for part in body.split('/').filter(|part| !part.is_empty()) {
			let (kind, name) = part.split_once('|')?;

			if kind.is_empty() || name.is_empty() {
				return None;
			}

			segments.push(PathSegment { kind: kind.to_string(), name: name.to_string() });
		}

		if segments.is_empty() { None } else { Some(Self { segments }) }
	}

	pub fn segments(&self) -> &[PathSegment] {
		&self.segments
	}

	pub fn starts_with(&self, prefix: &Self) -> bool {
		self.segments.len() >= prefix.segments.len()
			&& self.segments.iter().zip(&prefix.segments).all(|(a, b)| a == b)
	}
}
impl Display for ContainmentPath {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{BELONGSTO_PREFIX}")?;

		for segment in &self.segments {
			write!(f, "/{}|{}", segment.kind, segment.name)?;
		}

		Ok(())
	}
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ContainmentNode {
	pub id: NodeId,
	pub kind: String,
	pub name: String,
	#[serde(default)]
	pub parent: Option<NodeId>,
}

/// Arena of containment nodes with parent back-references. Parents are inserted first.
#[derive(Clone, Debug, Default)]
pub struct ContainmentTree {
	nodes: BTreeMap<NodeId, ContainmentNode>,
}
impl ContainmentTree {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, node: ContainmentNode) -> Result<()> {
		if self.nodes.contains_key(&node.id) {
			return Err(Error::InvalidContainmentTree {
				message: format!("node {} is already defined.", node.id),
			});
		}
		if let Some(parent) = node.parent
			&& !self.nodes.contains_key(&parent)
		{
			return Err(Error::InvalidContainmentTree {
				message: format!("node {} references missing parent {parent}.", node.id),
			});
		}

		self.nodes.insert(node.id, node);

		Ok(())
	}

	pub fn get(&self, id: NodeId) -> Option<&ContainmentNode> {
		self.nodes.get(&id)
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// The path from the root of the node's chain down to the node itself.
	pub fn path(&self, id: NodeId) -> Option<ContainmentPath> {
		let mut segments = Vec::new();
		let mut current = Some(self.nodes.get(&id)?);

		while let Some(node) = current {
			segments.push(PathSegment { kind: node.kind.clone(), name: node.name.clone() });

			current = node.parent.and_then(|parent| self.nodes.get(&parent));
		}

		segments.reverse();

		Some(ContainmentPath { segments })
	}

	/// Every node whose path satisfies `filter` for an entity of `role`.
	pub fn visible_nodes(&self, filter: &BelongstoFilter, role: ContainmentRole) -> BTreeSet<NodeId> {
		self.nodes
			.keys()
			.copied()
			.filter(|id| filter.matches(self.path(*id).as_ref(), role))
			.collect()
	}
}

/// A group's `belongsto` filter after parsing.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BelongstoFilter {
	Unrestricted,
	Paths(Vec<ContainmentPath>),
}
impl BelongstoFilter {
	/// Parses raw policy paths. Paths that do not parse, or that name a segment kind outside the
	/// containment tree, are dropped; if every path is dropped the filter matches nothing.
	pub fn compile(raw: &[String], is_containment_kind: impl Fn(&str) -> bool) -> Self {
		if raw.is_empty() {
			return Self::Unrestricted;
		}

		let mut paths = Vec::with_capacity(raw.len());

		for entry in raw {
			let Some(path) = ContainmentPath::parse(entry) else {
				tracing::warn!(path = %entry, "Containment path is malformed and matches nothing.");

				continue;
			};

			if let Some(segment) =
				path.segments().iter().find(|segment| !is_containment_kind(&segment.kind))
			{
				tracing::warn!(
					path = %entry,
					kind = %segment.kind,
					"Containment path names an unknown kind and matches nothing."
				);

				continue;
			}

			paths.push(path);
		}

		Self::Paths(paths)
	}

	pub fn is_unrestricted(&self) -> bool {
		matches!(self, Self::Unrestricted)
	}

	/// `Member` entities match at or below a filtered path. `Root` entities also match when a
	/// filtered path runs below them.
	pub fn matches(&self, entity_path: Option<&ContainmentPath>, role: ContainmentRole) -> bool {
		let paths = match self {
			Self::Unrestricted => return true,
			Self::Paths(paths) => paths,
		};
		let Some(entity_path) = entity_path else {
			return false;
		};

		paths.iter().any(|policy_path| {
			entity_path.starts_with(policy_path)
				|| (role == ContainmentRole::Root && policy_path.starts_with(entity_path))
		})
	}

	pub fn to_predicate(&self, tree: &ContainmentTree, role: ContainmentRole) -> Predicate {
		if self.is_unrestricted() {
			return Predicate::True;
		}

		let nodes = tree.visible_nodes(self, role);

		if nodes.is_empty() { Predicate::False } else { Predicate::ContainmentIn(nodes) }
	}
}
