//! Entity kinds and the capabilities they declare.
//!
//! A kind opts into each access axis by implementing the matching capability trait
//! ([`HasTenant`], [`HasTags`], [`HasContainmentChain`], [`HasOwnership`], [`ParticipatesInRbac`])
//! and recording it through [`Capabilities`]. The engine only ever looks at the resulting
//! [`KindDescriptor`], never at where a kind sits in the catalog.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::{Error, Result, containment::ContainmentRole, tenant::TenantStrategy};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
	String,
	Integer,
	Float,
	Boolean,
	Date,
	DateTime,
}
impl ColumnType {
	pub fn is_temporal(self) -> bool {
		matches!(self, Self::Date | Self::DateTime)
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Column {
	pub name: &'static str,
	pub column_type: ColumnType,
}
impl Column {
	pub const fn new(name: &'static str, column_type: ColumnType) -> Self {
		Self { name, column_type }
	}
}

/// Columns every table carries.
pub const BUILTIN_COLUMNS: [Column; 4] = [
	Column::new("id", ColumnType::Integer),
	Column::new("tenant_id", ColumnType::Integer),
	Column::new("owner_id", ColumnType::Integer),
	Column::new("group_id", ColumnType::Integer),
];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AssociationLink {
	/// The row holds `foreign_key` pointing at the target's id.
	BelongsTo { foreign_key: &'static str },
	/// Target rows hold `foreign_key` pointing at this row's id.
	HasMany { foreign_key: &'static str },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Association {
	pub name: &'static str,
	pub target: &'static str,
	pub link: AssociationLink,
}
impl Association {
	pub const fn belongs_to(
		name: &'static str,
		target: &'static str,
		foreign_key: &'static str,
	) -> Self {
		Self { name, target, link: AssociationLink::BelongsTo { foreign_key } }
	}

	pub const fn has_many(
		name: &'static str,
		target: &'static str,
		foreign_key: &'static str,
	) -> Self {
		Self { name, target, link: AssociationLink::HasMany { foreign_key } }
	}
}

/// Computed columns addressable from expressions.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VirtualColumn {
	/// A column read through belongs-to associations, e.g. a VM's host name.
	Alias { name: &'static str, associations: &'static [&'static str], column: &'static str },
	/// A boolean that holds when `column` equals `equals`.
	Flag { name: &'static str, column: &'static str, equals: &'static str },
}
impl VirtualColumn {
	pub fn name(&self) -> &'static str {
		match self {
			Self::Alias { name, .. } | Self::Flag { name, .. } => *name,
		}
	}
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum RbacMode {
	/// Not subject to access control.
	#[default]
	None,
	/// Tenant, tag, containment, and ownership filters apply to the kind's own rows.
	Direct,
	/// Rows inherit authorization from the `kind` row their `foreign_key` points at.
	Associated { kind: &'static str, foreign_key: &'static str },
	/// Rows are visible when `column` equals the requester's group id.
	UserGroup { column: &'static str },
}

pub trait EntityKind {
	const NAME: &'static str;
	const TABLE: &'static str;
	const BASE: Option<&'static str> = None;

	/// Subkinds returning the default inherit their base kind's capabilities.
	fn capabilities() -> Capabilities {
		Capabilities::default()
	}

	fn columns() -> Vec<Column> {
		Vec::new()
	}

	fn associations() -> Vec<Association> {
		Vec::new()
	}

	fn virtual_columns() -> Vec<VirtualColumn> {
		Vec::new()
	}
}

pub trait HasTenant: EntityKind {
	const STRATEGY: TenantStrategy;
}

pub trait HasTags: EntityKind {}

pub trait HasContainmentChain: EntityKind {
	const ROLE: ContainmentRole;
}

/// Rows carry `owner_id` and `group_id` for self-service narrowing.
pub trait HasOwnership: EntityKind {}

pub trait ParticipatesInRbac: EntityKind {
	const MODE: RbacMode;
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Capabilities {
	pub tenant: Option<TenantStrategy>,
	pub taggable: bool,
	pub containment: Option<ContainmentRole>,
	pub ownership: bool,
	pub rbac: RbacMode,
}
impl Capabilities {
	pub fn tenant<K: HasTenant>(mut self) -> Self {
		self.tenant = Some(K::STRATEGY);

		self
	}

	pub fn tags<K: HasTags>(mut self) -> Self {
		self.taggable = true;

		self
	}

	pub fn containment<K: HasContainmentChain>(mut self) -> Self {
		self.containment = Some(K::ROLE);

		self
	}

	pub fn ownership<K: HasOwnership>(mut self) -> Self {
		self.ownership = true;

		self
	}

	pub fn rbac<K: ParticipatesInRbac>(mut self) -> Self {
		self.rbac = K::MODE;

		self
	}
}

#[derive(Clone, Debug)]
pub struct KindDescriptor {
	pub name: &'static str,
	pub base: Option<&'static str>,
	pub table: &'static str,
	pub capabilities: Capabilities,
	pub columns: Vec<Column>,
	pub associations: Vec<Association>,
	pub virtual_columns: Vec<VirtualColumn>,
}
impl KindDescriptor {
	pub fn of<K: EntityKind>() -> Self {
		Self {
			name: K::NAME,
			base: K::BASE,
			table: K::TABLE,
			capabilities: K::capabilities(),
			columns: K::columns(),
			associations: K::associations(),
			virtual_columns: K::virtual_columns(),
		}
	}

	pub fn applies_rbac(&self) -> bool {
		self.capabilities.rbac != RbacMode::None
	}

	pub fn applies_associated_rbac(&self) -> bool {
		matches!(self.capabilities.rbac, RbacMode::Associated { .. })
	}

	pub fn applies_user_group_rbac(&self) -> bool {
		matches!(self.capabilities.rbac, RbacMode::UserGroup { .. })
	}

	pub fn tenant_strategy(&self) -> TenantStrategy {
		self.capabilities.tenant.unwrap_or(TenantStrategy::None)
	}

	pub fn is_taggable(&self) -> bool {
		self.capabilities.taggable
	}

	pub fn containment_role(&self) -> Option<ContainmentRole> {
		self.capabilities.containment
	}

	pub fn has_ownership(&self) -> bool {
		self.capabilities.ownership
	}

	pub fn column(&self, name: &str) -> Option<Column> {
		self.columns
			.iter()
			.chain(BUILTIN_COLUMNS.iter())
			.find(|column| column.name == name)
			.copied()
	}

	pub fn association(&self, name: &str) -> Option<&Association> {
		self.associations.iter().find(|association| association.name == name)
	}

	pub fn virtual_column(&self, name: &str) -> Option<&VirtualColumn> {
		self.virtual_columns.iter().find(|column| column.name() == name)
	}
}

#[derive(Clone, Debug, Default)]
pub struct KindRegistry {
	kinds: BTreeMap<&'static str, KindDescriptor>,
}
impl KindRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register<K: EntityKind>(&mut self) -> Result<()> {
		self.insert(KindDescriptor::of::<K>())
	}

	/// Adds a kind, merging in everything its base kind declares. Bases must be added first.
	pub fn insert(&mut self, mut descriptor: KindDescriptor) -> Result<()> {
		if self.kinds.contains_key(descriptor.name) {
			return Err(Error::InvalidCatalog {
				message: format!("kind {} is registered twice.", descriptor.name),
			});
		}

		if let Some(base_name) = descriptor.base {
			let base = self.kinds.get(base_name).ok_or_else(|| Error::InvalidCatalog {
				message: format!(
					"kind {} extends {base_name}, which is not registered.",
					descriptor.name
				),
			})?;

			if base.table != descriptor.table {
				return Err(Error::InvalidCatalog {
					message: format!(
						"kind {} must share table {} with its base {base_name}.",
						descriptor.name, base.table
					),
				});
			}
			if descriptor.capabilities == Capabilities::default() {
				descriptor.capabilities = base.capabilities;
			}

			descriptor.columns = merge(&base.columns, descriptor.columns, |column| column.name);
			descriptor.associations =
				merge(&base.associations, descriptor.associations, |association| association.name);
			descriptor.virtual_columns =
				merge(&base.virtual_columns, descriptor.virtual_columns, VirtualColumn::name);
		}

		self.kinds.insert(descriptor.name, descriptor);

		Ok(())
	}

	pub fn get(&self, name: &str) -> Option<&KindDescriptor> {
		self.kinds.get(name)
	}

	pub fn kind(&self, name: &str) -> Result<&KindDescriptor> {
		self.get(name).ok_or_else(|| Error::UnknownEntityKind { kind: name.to_string() })
	}

	pub fn iter(&self) -> impl Iterator<Item = &KindDescriptor> {
		self.kinds.values()
	}

	/// The kind and every kind that extends it, directly or transitively.
	pub fn family(&self, name: &str) -> Result<BTreeSet<String>> {
		self.kind(name)?;

		Ok(self
			.kinds
			.values()
			.filter(|descriptor| self.extends(descriptor, name))
			.map(|descriptor| descriptor.name.to_string())
			.collect())
	}

	/// Whether `name` may appear as a segment kind in containment paths.
	pub fn is_containment_kind(&self, name: &str) -> bool {
		self.get(name).map(|descriptor| descriptor.containment_role().is_some()).unwrap_or(false)
	}

	/// Replaces the tenant strategy of a kind and of every kind in its family.
	pub fn override_tenant_strategy(&mut self, name: &str, strategy: TenantStrategy) -> Result<()> {
		let family = self.family(name)?;

		for member in family {
			if let Some(descriptor) = self.kinds.get_mut(member.as_str()) {
				descriptor.capabilities.tenant = Some(strategy);
			}
		}

		Ok(())
	}

	fn extends(&self, descriptor: &KindDescriptor, ancestor: &str) -> bool {
		let mut current = Some(descriptor);

		while let Some(kind) = current {
			if kind.name == ancestor {
				return true;
			}

			current = kind.base.and_then(|base| self.kinds.get(base));
		}

		false
	}
}

fn merge<T: Copy>(base: &[T], own: Vec<T>, key: impl Fn(&T) -> &'static str) -> Vec<T> {
	let mut merged: Vec<T> =
		base.iter().filter(|item| !own.iter().any(|mine| key(mine) == key(*item))).copied().collect();

	merged.extend(own);

	merged
}
