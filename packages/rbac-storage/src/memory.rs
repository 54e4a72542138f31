//! In-memory stores that evaluate predicates row by row.

use std::{
	cmp::Ordering,
	collections::{BTreeMap, BTreeSet},
};

use rbac_domain::{
	containment::{ContainmentNode, ContainmentTree},
	entity::{AttrValue, Entity},
	ids::{EntityId, GroupId, UserId},
	kinds::{AssociationLink, KindDescriptor, KindRegistry},
	policy::{Group, User},
	predicate::{AssociationStep, CmpOp, FieldRef, Predicate, Quantifier},
	tenant::{Tenant, TenantTree},
};

use crate::{
	Error, PolicyStore, Repository, Result,
	models::{Direction, Page},
};

#[derive(Clone, Debug, Default)]
pub struct MemoryRepository {
	kinds: KindRegistry,
	tables: BTreeMap<&'static str, BTreeMap<EntityId, Entity>>,
	containment: ContainmentTree,
}
impl MemoryRepository {
	pub fn new(kinds: KindRegistry) -> Self {
		Self { kinds, tables: BTreeMap::new(), containment: ContainmentTree::new() }
	}

	pub fn insert(&mut self, entity: Entity) -> Result<()> {
		let table = self.kinds.kind(&entity.kind)?.table;

		if let Some(node) = entity.containment_node
			&& self.containment.get(node).is_none()
		{
			return Err(Error::InvalidArgument(format!(
				"{} {} is placed on missing containment node {node}.",
				entity.kind, entity.id
			)));
		}

		let rows = self.tables.entry(table).or_default();

		if rows.contains_key(&entity.id) {
			return Err(Error::InvalidArgument(format!(
				"{table} already holds a row with id {}.",
				entity.id
			)));
		}

		rows.insert(entity.id, entity);

		Ok(())
	}

	pub fn insert_node(&mut self, node: ContainmentNode) -> Result<()> {
		Ok(self.containment.insert(node)?)
	}

	pub fn kinds(&self) -> &KindRegistry {
		&self.kinds
	}

	fn rows(&self, table: &str) -> impl Iterator<Item = &Entity> {
		self.tables.get(table).into_iter().flat_map(|rows| rows.values())
	}

	/// Whether `row` satisfies `predicate`.
	pub fn matches(&self, row: &Entity, predicate: &Predicate) -> bool {
		match predicate {
			Predicate::True => true,
			Predicate::False => false,
			Predicate::And(parts) => parts.iter().all(|part| self.matches(row, part)),
			Predicate::Or(parts) => parts.iter().any(|part| self.matches(row, part)),
			Predicate::Not(inner) => !self.matches(row, inner),
			Predicate::KindIn(kinds) => kinds.contains(&row.kind),
			Predicate::IdIn(ids) => ids.contains(&row.id),
			Predicate::TenantIn(tenants) =>
				row.tenant_id.map(|tenant| tenants.contains(&tenant)).unwrap_or(false),
			Predicate::HasTag(tag) => row.tags.contains(tag),
			Predicate::ContainmentIn(nodes) =>
				row.containment_node.map(|node| nodes.contains(&node)).unwrap_or(false),
			Predicate::Compare { field, op, value } => self
				.reach(row, &field.steps)
				.into_iter()
				.any(|target| compare(&target.value(&field.column), *op, value)),
			Predicate::IsNull(field) => self.any_value(row, field, AttrValue::is_null),
			Predicate::IsEmpty(field) => self.any_value(row, field, |value| match value {
				AttrValue::Null => true,
				AttrValue::String(s) => s.is_empty(),
				_ => false,
			}),
			Predicate::Related { steps, quantifier, search, check } => {
				let candidates: Vec<&Entity> = self
					.reach(row, steps)
					.into_iter()
					.filter(|target| self.matches(target, search))
					.collect();

				match quantifier {
					Quantifier::Any => candidates.iter().any(|target| self.matches(target, check)),
					Quantifier::All =>
						!candidates.is_empty()
							&& candidates.iter().all(|target| self.matches(target, check)),
				}
			},
			Predicate::InSubquery { column, table, select, filter } => {
				let needle = row.value(column);

				if needle.is_null() {
					return false;
				}

				self.rows(table)
					.filter(|candidate| self.matches(candidate, filter))
					.any(|candidate| candidate.value(select) == needle)
			},
		}
	}

	fn any_value(
		&self,
		row: &Entity,
		field: &FieldRef,
		test: impl Fn(&AttrValue) -> bool,
	) -> bool {
		self.reach(row, &field.steps).into_iter().any(|target| test(&target.value(&field.column)))
	}

	/// Rows reached from `row` by following `steps`. With no steps, the row itself.
	fn reach<'a>(&'a self, row: &'a Entity, steps: &[AssociationStep]) -> Vec<&'a Entity> {
		let mut frontier = vec![row];

		for step in steps {
			let mut next = Vec::new();

			for current in frontier {
				match step.link {
					AssociationLink::BelongsTo { foreign_key } => {
						let Some(target_id) = current.value(foreign_key).as_i64() else {
							continue;
						};
						let target = self
							.tables
							.get(step.table)
							.and_then(|rows| rows.get(&EntityId(target_id as u64)))
							.filter(|target| step.kinds.contains(&target.kind));

						next.extend(target);
					},
					AssociationLink::HasMany { foreign_key } => {
						let id = AttrValue::Integer(current.id.0 as i64);

						next.extend(self.rows(step.table).filter(|target| {
							step.kinds.contains(&target.kind) && target.value(foreign_key) == id
						}));
					},
				}
			}

			frontier = next;
		}

		frontier
	}
}
impl Repository for MemoryRepository {
	fn count(&self, kind: &KindDescriptor, predicate: &Predicate) -> Result<u64> {
		Ok(self.rows(kind.table).filter(|row| self.matches(row, predicate)).count() as u64)
	}

	fn fetch(
		&self,
		kind: &KindDescriptor,
		predicate: &Predicate,
		page: &Page,
	) -> Result<Vec<Entity>> {
		for key in &page.order {
			if kind.column(&key.column).is_none() {
				return Err(Error::InvalidArgument(format!(
					"{} has no column {} to order by.",
					kind.name, key.column
				)));
			}
		}

		let mut rows: Vec<&Entity> =
			self.rows(kind.table).filter(|row| self.matches(row, predicate)).collect();

		rows.sort_by(|a, b| {
			for key in &page.order {
				let ordering =
					order_values(&a.value(&key.column), &b.value(&key.column), key.direction);

				if ordering != Ordering::Equal {
					return ordering;
				}
			}

			a.id.cmp(&b.id)
		});

		let offset = usize::try_from(page.offset).unwrap_or(usize::MAX);
		let limit = page.limit.and_then(|limit| usize::try_from(limit).ok()).unwrap_or(usize::MAX);

		Ok(rows.into_iter().skip(offset).take(limit).cloned().collect())
	}

	fn containment(&self) -> Result<&ContainmentTree> {
		Ok(&self.containment)
	}
}

#[derive(Clone, Debug, Default)]
pub struct MemoryPolicyStore {
	tenants: TenantTree,
	groups: BTreeMap<GroupId, Group>,
	users: BTreeMap<UserId, User>,
}
impl MemoryPolicyStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert_tenant(&mut self, tenant: Tenant) -> Result<()> {
		Ok(self.tenants.insert(tenant)?)
	}

	pub fn insert_group(&mut self, group: Group) -> Result<()> {
		if self.tenants.get(group.tenant_id).is_none() {
			return Err(Error::InvalidArgument(format!(
				"group {} belongs to missing tenant {}.",
				group.id, group.tenant_id
			)));
		}
		if self.groups.contains_key(&group.id) {
			return Err(Error::InvalidArgument(format!("group {} is already defined.", group.id)));
		}

		self.groups.insert(group.id, group);

		Ok(())
	}

	pub fn insert_user(&mut self, user: User) -> Result<()> {
		let memberships: BTreeSet<GroupId> =
			user.group_ids.iter().copied().chain(user.current_group).collect();

		if let Some(missing) = memberships.iter().find(|group| !self.groups.contains_key(*group)) {
			return Err(Error::InvalidArgument(format!(
				"user {} references missing group {missing}.",
				user.id
			)));
		}
		if self.users.contains_key(&user.id) {
			return Err(Error::InvalidArgument(format!("user {} is already defined.", user.id)));
		}

		self.users.insert(user.id, user);

		Ok(())
	}
}
impl PolicyStore for MemoryPolicyStore {
	fn user(&self, id: UserId) -> Result<Option<User>> {
		Ok(self.users.get(&id).cloned())
	}

	fn group(&self, id: GroupId) -> Result<Option<Group>> {
		Ok(self.groups.get(&id).cloned())
	}

	fn tenants(&self) -> Result<&TenantTree> {
		Ok(&self.tenants)
	}
}

/// SQL comparison semantics: a null operand or an incomparable pair never matches.
pub fn compare(actual: &AttrValue, op: CmpOp, expected: &AttrValue) -> bool {
	if actual.is_null() || expected.is_null() {
		return false;
	}

	match op {
		CmpOp::StartsWith | CmpOp::EndsWith | CmpOp::Contains => {
			let (Some(actual), Some(expected)) = (actual.as_str(), expected.as_str()) else {
				return false;
			};

			match op {
				CmpOp::StartsWith => actual.starts_with(expected),
				CmpOp::EndsWith => actual.ends_with(expected),
				_ => actual.contains(expected),
			}
		},
		_ => {
			let Some(ordering) = actual.compare(expected) else {
				return false;
			};

			match op {
				CmpOp::Eq => ordering == Ordering::Equal,
				CmpOp::Ne => ordering != Ordering::Equal,
				CmpOp::Lt => ordering == Ordering::Less,
				CmpOp::Le => ordering != Ordering::Greater,
				CmpOp::Gt => ordering == Ordering::Greater,
				_ => ordering != Ordering::Less,
			}
		},
	}
}

fn order_values(a: &AttrValue, b: &AttrValue, direction: Direction) -> Ordering {
	match (a.is_null(), b.is_null(), direction) {
		(true, true, _) => Ordering::Equal,
		(true, false, Direction::Asc) | (false, true, Direction::Desc) => Ordering::Greater,
		(false, true, Direction::Asc) | (true, false, Direction::Desc) => Ordering::Less,
		(false, false, Direction::Asc) => a.compare(b).unwrap_or(Ordering::Equal),
		(false, false, Direction::Desc) => b.compare(a).unwrap_or(Ordering::Equal),
	}
}
