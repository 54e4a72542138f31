//! Resolution of expression field names such as `Vm-name` or `Vm.host-name` against the kind
//! catalog.

use crate::{
	Error, Result,
	entity::AttrValue,
	kinds::{AssociationLink, ColumnType, KindDescriptor, KindRegistry, VirtualColumn},
	predicate::{AssociationStep, FieldRef},
};

/// The syntactic parts of a field name: `Kind.assoc.assoc-column`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldPath {
	pub kind: String,
	pub associations: Vec<String>,
	pub column: String,
}
impl FieldPath {
	pub fn parse(raw: &str) -> Option<Self> {
		let (head, column) = raw.trim().split_once('-')?;
		let mut parts = head.split('.');
		let kind = parts.next().filter(|kind| !kind.is_empty())?;
		let associations: Vec<String> = parts.map(str::to_string).collect();

		if column.is_empty() || associations.iter().any(String::is_empty) {
			return None;
		}

		Some(Self { kind: kind.to_string(), associations, column: column.to_string() })
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum ResolvedField {
	Column(FieldRef),
	/// A derived boolean that holds when `field` equals `equals`.
	Flag { field: FieldRef, equals: AttrValue },
}
impl ResolvedField {
	pub fn field(&self) -> &FieldRef {
		match self {
			Self::Column(field) | Self::Flag { field, .. } => field,
		}
	}

	pub fn column_type(&self) -> ColumnType {
		match self {
			Self::Column(field) => field.column_type,
			Self::Flag { .. } => ColumnType::Boolean,
		}
	}
}

#[derive(Clone, Copy, Debug)]
pub struct FieldResolver<'a> {
	registry: &'a KindRegistry,
}
impl<'a> FieldResolver<'a> {
	pub fn new(registry: &'a KindRegistry) -> Self {
		Self { registry }
	}

	pub fn registry(&self) -> &'a KindRegistry {
		self.registry
	}

	/// Resolves `raw` for a search over `base`. The field's kind label must name a kind stored in
	/// the same table as `base`.
	pub fn resolve(&self, base: &KindDescriptor, raw: &str) -> Result<ResolvedField> {
		let unknown = || Error::UnknownField { kind: base.name.to_string(), field: raw.to_string() };
		let path = FieldPath::parse(raw).ok_or_else(unknown)?;
		let label = self.registry.kind(&path.kind)?;

		if label.table != base.table {
			return Err(unknown());
		}

		let (mut steps, target) = self.walk(label, &path.associations)?;

		if let Some(column) = target.column(&path.column) {
			return Ok(ResolvedField::Column(FieldRef {
				steps,
				column: column.name.to_string(),
				column_type: column.column_type,
			}));
		}

		match target.virtual_column(&path.column).copied() {
			Some(VirtualColumn::Alias { associations, column, .. }) => {
				let names: Vec<String> = associations.iter().map(|name| name.to_string()).collect();
				let (alias_steps, alias_target) = self.walk(target, &names)?;
				let column = alias_target.column(column).ok_or_else(unknown)?;

				steps.extend(alias_steps);

				Ok(ResolvedField::Column(FieldRef {
					steps,
					column: column.name.to_string(),
					column_type: column.column_type,
				}))
			},
			Some(VirtualColumn::Flag { column, equals, .. }) => {
				let column = target.column(column).ok_or_else(unknown)?;

				Ok(ResolvedField::Flag {
					field: FieldRef {
						steps,
						column: column.name.to_string(),
						column_type: column.column_type,
					},
					equals: AttrValue::String(equals.to_string()),
				})
			},
			None => Err(unknown()),
		}
	}

	/// Follows association names from `start`, returning the steps and the kind reached.
	pub fn walk(
		&self,
		start: &'a KindDescriptor,
		associations: &[String],
	) -> Result<(Vec<AssociationStep>, &'a KindDescriptor)> {
		let mut steps = Vec::with_capacity(associations.len());
		let mut current = start;

		for name in associations {
			let association = current.association(name).ok_or_else(|| Error::UnknownAssociation {
				kind: current.name.to_string(),
				association: name.clone(),
			})?;
			let target = self.registry.kind(association.target)?;

			steps.push(AssociationStep {
				association: association.name.to_string(),
				table: target.table,
				kinds: self.registry.family(target.name)?,
				link: association.link,
			});

			current = target;
		}

		Ok((steps, current))
	}

	/// The first belongs-to association from `from` to any kind in `to`'s table.
	pub fn belongs_to_link(
		&self,
		from: &'a KindDescriptor,
		to: &KindDescriptor,
	) -> Option<(&'static str, &'static str)> {
		from.associations.iter().find_map(|association| match association.link {
			AssociationLink::BelongsTo { foreign_key } => self
				.registry
				.get(association.target)
				.filter(|target| target.table == to.table)
				.map(|_| (association.name, foreign_key)),
			AssociationLink::HasMany { .. } => None,
		})
	}
}
