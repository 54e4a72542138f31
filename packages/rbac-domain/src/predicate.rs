//! Storage-neutral boolean predicates over entity rows.
//!
//! A [`Predicate`] is the single composed form every access strategy and filter expression
//! compiles to. Repositories translate it to their native query language; nothing here loads
//! rows.

use std::collections::BTreeSet;

use crate::{
	entity::AttrValue,
	ids::{EntityId, NodeId, TenantId},
	kinds::{AssociationLink, ColumnType},
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CmpOp {
	Eq,
	Ne,
	Lt,
	Le,
	Gt,
	Ge,
	StartsWith,
	EndsWith,
	Contains,
}
impl CmpOp {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Eq => "=",
			Self::Ne => "!=",
			Self::Lt => "<",
			Self::Le => "<=",
			Self::Gt => ">",
			Self::Ge => ">=",
			Self::StartsWith => "STARTS WITH",
			Self::EndsWith => "ENDS WITH",
			Self::Contains => "CONTAINS",
		}
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Quantifier {
	Any,
	All,
}

/// One hop from a row to related rows in another table.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AssociationStep {
	pub association: String,
	pub table: &'static str,
	pub kinds: BTreeSet<String>,
	pub link: AssociationLink,
}

/// A column reached from the row under test through zero or more association steps.
///
/// Leaves over a non-empty step list hold when at least one reached row satisfies them. A
/// belongs-to step whose target row is missing reaches nothing.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldRef {
	pub steps: Vec<AssociationStep>,
	pub column: String,
	pub column_type: ColumnType,
}
impl FieldRef {
	pub fn local(column: impl Into<String>, column_type: ColumnType) -> Self {
		Self { steps: Vec::new(), column: column.into(), column_type }
	}

	pub fn crosses_has_many(&self) -> bool {
		self.steps.iter().any(|step| matches!(step.link, AssociationLink::HasMany { .. }))
	}

	/// Drops the first `count` steps, re-rooting the reference at the row those steps reach.
	pub fn strip_steps(&self, count: usize) -> Self {
		Self {
			steps: self.steps.iter().skip(count).cloned().collect(),
			column: self.column.clone(),
			column_type: self.column_type,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
	True,
	False,
	And(Vec<Predicate>),
	Or(Vec<Predicate>),
	Not(Box<Predicate>),
	KindIn(BTreeSet<String>),
	IdIn(BTreeSet<EntityId>),
	TenantIn(BTreeSet<TenantId>),
	HasTag(String),
	ContainmentIn(BTreeSet<NodeId>),
	Compare {
		field: FieldRef,
		op: CmpOp,
		value: AttrValue,
	},
	IsNull(FieldRef),
	/// Null or the empty string.
	IsEmpty(FieldRef),
	Related {
		steps: Vec<AssociationStep>,
		quantifier: Quantifier,
		search: Box<Predicate>,
		check: Box<Predicate>,
	},
	/// `column IN (SELECT select FROM table WHERE filter)`; `filter` is evaluated against rows of
	/// `table`.
	InSubquery {
		column: String,
		table: &'static str,
		select: String,
		filter: Box<Predicate>,
	},
}
impl Predicate {
	/// Conjunction that flattens nested `And`s and folds constants.
	pub fn and(parts: impl IntoIterator<Item = Predicate>) -> Self {
		let mut flat = Vec::new();

		for part in parts {
			match part {
				Self::True => {},
				Self::False => return Self::False,
				Self::And(inner) => flat.extend(inner),
				other => flat.push(other),
			}
		}

		match flat.len() {
			0 => Self::True,
			1 => flat.remove(0),
			_ => Self::And(flat),
		}
	}

	/// Disjunction that flattens nested `Or`s and folds constants.
	pub fn or(parts: impl IntoIterator<Item = Predicate>) -> Self {
		let mut flat = Vec::new();

		for part in parts {
			match part {
				Self::False => {},
				Self::True => return Self::True,
				Self::Or(inner) => flat.extend(inner),
				other => flat.push(other),
			}
		}

		match flat.len() {
			0 => Self::False,
			1 => flat.remove(0),
			_ => Self::Or(flat),
		}
	}

	pub fn negate(self) -> Self {
		match self {
			Self::True => Self::False,
			Self::False => Self::True,
			Self::Not(inner) => *inner,
			other => Self::Not(Box::new(other)),
		}
	}

	pub fn compare(field: FieldRef, op: CmpOp, value: AttrValue) -> Self {
		Self::Compare { field, op, value }
	}

	pub fn ids(ids: impl IntoIterator<Item = EntityId>) -> Self {
		let ids: BTreeSet<_> = ids.into_iter().collect();

		if ids.is_empty() { Self::False } else { Self::IdIn(ids) }
	}

	pub fn is_true(&self) -> bool {
		matches!(self, Self::True)
	}

	pub fn is_false(&self) -> bool {
		matches!(self, Self::False)
	}

	/// Counts nodes, used for logging plan sizes.
	pub fn node_count(&self) -> usize {
		match self {
			Self::And(parts) | Self::Or(parts) => 1 + parts.iter().map(Self::node_count).sum::<usize>(),
			Self::Not(inner) => 1 + inner.node_count(),
			Self::Related { search, check, .. } => 1 + search.node_count() + check.node_count(),
			Self::InSubquery { filter, .. } => 1 + filter.node_count(),
			_ => 1,
		}
	}
}
