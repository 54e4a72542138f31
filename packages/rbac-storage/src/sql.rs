//! Postgres rendering of predicates against the layout produced by [`crate::schema`].
//!
//! Association steps become correlated `EXISTS` subqueries and tags are looked up in the
//! `taggings` table, so a rendered query never returns more rows than the in-memory evaluator
//! would.

use sqlx::{Postgres, QueryBuilder};

use rbac_domain::{
	entity::AttrValue,
	kinds::{AssociationLink, KindDescriptor},
	predicate::{AssociationStep, CmpOp, Predicate, Quantifier},
};

use crate::{
	Error, Result,
	models::{Direction, Page},
};

pub type Builder = QueryBuilder<'static, Postgres>;

const ROOT_ALIAS: &str = "a0";

pub fn count_query(kind: &KindDescriptor, predicate: &Predicate) -> Builder {
	let mut builder = QueryBuilder::new(format!(
		"SELECT COUNT(*) FROM {} {ROOT_ALIAS} WHERE ",
		kind.table
	));

	Renderer::default().push_predicate(&mut builder, ROOT_ALIAS, kind.table, predicate);

	builder
}

pub fn fetch_query(kind: &KindDescriptor, predicate: &Predicate, page: &Page) -> Result<Builder> {
	for key in &page.order {
		if kind.column(&key.column).is_none() {
			return Err(Error::InvalidArgument(format!(
				"{} has no column {} to order by.",
				kind.name, key.column
			)));
		}
	}

	let mut builder =
		QueryBuilder::new(format!("SELECT {ROOT_ALIAS}.* FROM {} {ROOT_ALIAS} WHERE ", kind.table));

	Renderer::default().push_predicate(&mut builder, ROOT_ALIAS, kind.table, predicate);

	builder.push(" ORDER BY ");

	for key in &page.order {
		let direction = match key.direction {
			Direction::Asc => "ASC NULLS LAST",
			Direction::Desc => "DESC NULLS FIRST",
		};

		builder.push(format!("{ROOT_ALIAS}.{} {direction}, ", key.column));
	}

	builder.push(format!("{ROOT_ALIAS}.id ASC"));

	if let Some(limit) = page.limit {
		builder.push(" LIMIT ");
		builder.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
	}
	if page.offset > 0 {
		builder.push(" OFFSET ");
		builder.push_bind(i64::try_from(page.offset).unwrap_or(i64::MAX));
	}

	Ok(builder)
}

#[derive(Default)]
struct Renderer {
	next_alias: usize,
}
impl Renderer {
	fn alias(&mut self) -> String {
		self.next_alias += 1;

		format!("a{}", self.next_alias)
	}

	fn push_predicate(
		&mut self,
		builder: &mut Builder,
		alias: &str,
		table: &'static str,
		predicate: &Predicate,
	) {
		match predicate {
			Predicate::True => {
				builder.push("TRUE");
			},
			Predicate::False => {
				builder.push("FALSE");
			},
			Predicate::And(parts) => self.push_joined(builder, alias, table, parts, " AND "),
			Predicate::Or(parts) => self.push_joined(builder, alias, table, parts, " OR "),
			// Comparisons against NULL columns yield NULL, which must negate to TRUE.
			Predicate::Not(inner) => {
				builder.push("(");
				self.push_predicate(builder, alias, table, inner);
				builder.push(") IS NOT TRUE");
			},
			Predicate::KindIn(kinds) => {
				builder.push(format!("{alias}.kind = ANY("));
				builder.push_bind(kinds.iter().cloned().collect::<Vec<_>>());
				builder.push(")");
			},
			Predicate::IdIn(ids) => {
				builder.push(format!("{alias}.id = ANY("));
				builder.push_bind(ids.iter().map(|id| id.0 as i64).collect::<Vec<_>>());
				builder.push(")");
			},
			Predicate::TenantIn(tenants) => {
				builder.push(format!("{alias}.tenant_id = ANY("));
				builder.push_bind(tenants.iter().map(|id| id.0 as i64).collect::<Vec<_>>());
				builder.push(")");
			},
			Predicate::HasTag(tag) => {
				let tagging = self.alias();

				builder.push(format!(
					"EXISTS (SELECT 1 FROM taggings {tagging} WHERE {tagging}.taggable_table = "
				));
				builder.push_bind(table.to_string());
				builder.push(format!(
					" AND {tagging}.taggable_id = {alias}.id AND {tagging}.tag = "
				));
				builder.push_bind(tag.clone());
				builder.push(")");
			},
			Predicate::ContainmentIn(nodes) => {
				builder.push(format!("{alias}.containment_node_id = ANY("));
				builder.push_bind(nodes.iter().map(|id| id.0 as i64).collect::<Vec<_>>());
				builder.push(")");
			},
			Predicate::Compare { field, op, value } =>
				self.push_through(builder, alias, table, &field.steps, |_, builder, target, _| {
					push_comparison(builder, target, &field.column, *op, value);
				}),
			Predicate::IsNull(field) =>
				self.push_through(builder, alias, table, &field.steps, |_, builder, target, _| {
					builder.push(format!("{target}.{} IS NULL", field.column));
				}),
			Predicate::IsEmpty(field) =>
				self.push_through(builder, alias, table, &field.steps, |_, builder, target, _| {
					builder.push(format!(
						"({target}.{column} IS NULL OR {target}.{column} = '')",
						column = field.column
					));
				}),
			Predicate::Related { steps, quantifier: Quantifier::Any, search, check } =>
				self.push_through(builder, alias, table, steps, |renderer, builder, target, target_table| {
					renderer.push_joined(
						builder,
						target,
						target_table,
						&[(**search).clone(), (**check).clone()],
						" AND ",
					);
				}),
			Predicate::Related { steps, quantifier: Quantifier::All, search, check } => {
				builder.push("(");
				self.push_through(builder, alias, table, steps, |renderer, builder, target, target_table| {
					renderer.push_predicate(builder, target, target_table, search);
				});
				builder.push(" AND NOT ");
				self.push_through(builder, alias, table, steps, |renderer, builder, target, target_table| {
					let failing = Predicate::And(vec![
						(**search).clone(),
						Predicate::Not(check.clone()),
					]);

					renderer.push_predicate(builder, target, target_table, &failing);
				});
				builder.push(")");
			},
			Predicate::InSubquery { column, table: inner_table, select, filter } => {
				let inner = self.alias();

				builder.push(format!(
					"{alias}.{column} IN (SELECT {inner}.{select} FROM {inner_table} {inner} WHERE "
				));
				self.push_predicate(builder, &inner, inner_table, filter);
				builder.push(")");
			},
		}
	}

	fn push_joined(
		&mut self,
		builder: &mut Builder,
		alias: &str,
		table: &'static str,
		parts: &[Predicate],
		separator: &str,
	) {
		builder.push("(");

		for (index, part) in parts.iter().enumerate() {
			if index > 0 {
				builder.push(separator);
			}

			self.push_predicate(builder, alias, table, part);
		}

		builder.push(")");
	}

	/// Wraps `leaf` in one correlated `EXISTS` per association step; `leaf` receives the alias
	/// and table of the rows the steps reach.
	fn push_through<F>(
		&mut self,
		builder: &mut Builder,
		alias: &str,
		table: &'static str,
		steps: &[AssociationStep],
		leaf: F,
	) where
		F: FnOnce(&mut Self, &mut Builder, &str, &'static str),
	{
		let Some((step, rest)) = steps.split_first() else {
			leaf(self, builder, alias, table);

			return;
		};
		let next = self.alias();

		builder.push(format!("EXISTS (SELECT 1 FROM {} {next} WHERE ", step.table));

		match step.link {
			AssociationLink::BelongsTo { foreign_key } =>
				builder.push(format!("{next}.id = {alias}.{foreign_key}")),
			AssociationLink::HasMany { foreign_key } =>
				builder.push(format!("{next}.{foreign_key} = {alias}.id")),
		};

		builder.push(format!(" AND {next}.kind = ANY("));
		builder.push_bind(step.kinds.iter().cloned().collect::<Vec<_>>());
		builder.push(") AND ");
		self.push_through(builder, &next, step.table, rest, leaf);
		builder.push(")");
	}
}

fn push_comparison(builder: &mut Builder, alias: &str, column: &str, op: CmpOp, value: &AttrValue) {
	if value.is_null() {
		builder.push("FALSE");

		return;
	}

	let operator = match op {
		CmpOp::Eq => "=",
		CmpOp::Ne => "<>",
		CmpOp::Lt => "<",
		CmpOp::Le => "<=",
		CmpOp::Gt => ">",
		CmpOp::Ge => ">=",
		CmpOp::StartsWith | CmpOp::EndsWith | CmpOp::Contains => {
			let Some(text) = value.as_str() else {
				builder.push("FALSE");

				return;
			};
			let escaped = escape_like(text);
			let pattern = match op {
				CmpOp::StartsWith => format!("{escaped}%"),
				CmpOp::EndsWith => format!("%{escaped}"),
				_ => format!("%{escaped}%"),
			};

			builder.push(format!("{alias}.{column} LIKE "));
			builder.push_bind(pattern);

			return;
		},
	};

	builder.push(format!("{alias}.{column} {operator} "));

	match value {
		AttrValue::String(text) => {
			builder.push_bind(text.clone());
		},
		AttrValue::Integer(number) => {
			builder.push_bind(*number);
		},
		AttrValue::Float(number) => {
			builder.push_bind(*number);
		},
		AttrValue::Boolean(flag) => {
			builder.push_bind(*flag);
		},
		AttrValue::Date(date) => {
			builder.push_bind(*date);
		},
		AttrValue::DateTime(ts) => {
			builder.push_bind(*ts);
		},
		AttrValue::Null => {
			builder.push("NULL");
		},
	}
}

fn escape_like(raw: &str) -> String {
	let mut escaped = String::with_capacity(raw.len());

	for ch in raw.chars() {
		if matches!(ch, '%' | '_' | '\\') {
			escaped.push('\\');
		}

		escaped.push(ch);
	}

	escaped
}
