//! The filter expression language and its translation into [`Predicate`]s.
//!
//! Expressions arrive in their JSON form, one operator key per node:
//! `{"AND": [{"=": {"field": "Vm-name", "value": "web"}}, {"IS": {"field": "Vm-retires_on", "value": "Today"}}]}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time_tz::Tz;

use rbac_domain::{
	entity::AttrValue,
	fields::{FieldResolver, ResolvedField},
	kinds::{ColumnType, KindDescriptor},
	predicate::{AssociationStep, CmpOp, FieldRef, Predicate, Quantifier},
};

use crate::{
	Error, Result,
	dates::{DateContext, TimeRange},
};

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum Expression {
	#[serde(rename = "AND", alias = "and")]
	And(Vec<Expression>),
	#[serde(rename = "OR", alias = "or")]
	Or(Vec<Expression>),
	#[serde(rename = "NOT", alias = "not")]
	Not(Box<Expression>),
	#[serde(rename = "=", alias = "EQUALS")]
	Equals(FieldValue),
	#[serde(rename = "!=")]
	NotEquals(FieldValue),
	#[serde(rename = "STARTS WITH")]
	StartsWith(FieldValue),
	#[serde(rename = "ENDS WITH")]
	EndsWith(FieldValue),
	#[serde(rename = "CONTAINS")]
	Contains(FieldValue),
	#[serde(rename = "IS")]
	Is(FieldValue),
	#[serde(rename = "IS EMPTY")]
	IsEmpty(FieldOnly),
	#[serde(rename = "IS NOT EMPTY")]
	IsNotEmpty(FieldOnly),
	#[serde(rename = "IS NULL")]
	IsNull(FieldOnly),
	#[serde(rename = "IS NOT NULL")]
	IsNotNull(FieldOnly),
	#[serde(rename = "AFTER")]
	After(FieldValue),
	#[serde(rename = "BEFORE")]
	Before(FieldValue),
	#[serde(rename = ">")]
	Greater(FieldValue),
	#[serde(rename = ">=")]
	GreaterOrEqual(FieldValue),
	#[serde(rename = "<")]
	Less(FieldValue),
	#[serde(rename = "<=")]
	LessOrEqual(FieldValue),
	#[serde(rename = "FROM")]
	From(FieldValue),
	#[serde(rename = "FIND")]
	Find(Find),
}
impl Expression {
	/// Parses the JSON form, reporting unknown operators as malformed expressions.
	pub fn parse(raw: &Value) -> Result<Self> {
		Self::deserialize(raw).map_err(|err| Error::malformed("$", err.to_string()))
	}

	pub fn field(field: &str, op: &str, value: impl Into<Value>) -> Result<Self> {
		let mut node = serde_json::Map::new();

		node.insert(
			op.to_string(),
			serde_json::json!({ "field": field, "value": value.into() }),
		);

		Self::parse(&Value::Object(node))
	}

	fn fields<'a>(&'a self, out: &mut Vec<&'a str>) {
		match self {
			Self::And(parts) | Self::Or(parts) => parts.iter().for_each(|part| part.fields(out)),
			Self::Not(inner) => inner.fields(out),
			Self::IsEmpty(leaf) | Self::IsNotEmpty(leaf) | Self::IsNull(leaf) | Self::IsNotNull(leaf) =>
				out.push(&leaf.field),
			Self::Find(find) =>
				[&find.search, &find.checkany, &find.checkall]
					.into_iter()
					.flatten()
					.for_each(|inner| inner.fields(out)),
			Self::Equals(leaf)
			| Self::NotEquals(leaf)
			| Self::StartsWith(leaf)
			| Self::EndsWith(leaf)
			| Self::Contains(leaf)
			| Self::Is(leaf)
			| Self::After(leaf)
			| Self::Before(leaf)
			| Self::Greater(leaf)
			| Self::GreaterOrEqual(leaf)
			| Self::Less(leaf)
			| Self::LessOrEqual(leaf)
			| Self::From(leaf) => out.push(&leaf.field),
		}
	}
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct FieldValue {
	pub field: String,
	#[serde(default)]
	pub value: Value,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct FieldOnly {
	pub field: String,
}

/// Related rows narrowed by `search`, then tested with exactly one of `checkany` or `checkall`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Find {
	#[serde(default)]
	pub search: Option<Box<Expression>>,
	#[serde(default)]
	pub checkany: Option<Box<Expression>>,
	#[serde(default)]
	pub checkall: Option<Box<Expression>>,
}

#[derive(Clone, Copy, Debug)]
pub struct Limits {
	pub max_depth: usize,
	pub max_nodes: usize,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Op {
	Eq,
	Ne,
	StartsWith,
	EndsWith,
	Contains,
	After,
	Before,
	Ge,
	Le,
}
impl Op {
	fn name(self) -> &'static str {
		match self {
			Self::Eq => "=",
			Self::Ne => "!=",
			Self::StartsWith => "STARTS WITH",
			Self::EndsWith => "ENDS WITH",
			Self::Contains => "CONTAINS",
			Self::After => ">",
			Self::Before => "<",
			Self::Ge => ">=",
			Self::Le => "<=",
		}
	}
}

/// Association steps shared by every field inside a `FIND`; fields are re-rooted past them.
struct FindScope {
	steps: Vec<AssociationStep>,
}

pub struct Evaluator<'a> {
	resolver: FieldResolver<'a>,
	base: &'a KindDescriptor,
	dates: DateContext<'a>,
	limits: Limits,
	nodes: usize,
	find: Option<FindScope>,
}
impl<'a> Evaluator<'a> {
	pub fn new(
		resolver: FieldResolver<'a>,
		base: &'a KindDescriptor,
		dates: DateContext<'a>,
		limits: Limits,
	) -> Self {
		Self { resolver, base, dates, limits, nodes: 0, find: None }
	}

	pub fn evaluate(&mut self, expression: &Expression) -> Result<Predicate> {
		self.nodes = 0;

		self.visit(expression, "$", 1)
	}

	fn visit(&mut self, expression: &Expression, path: &str, depth: usize) -> Result<Predicate> {
		if depth > self.limits.max_depth {
			return Err(Error::malformed(
				path,
				format!("nesting exceeds the limit of {}.", self.limits.max_depth),
			));
		}

		self.nodes += 1;

		if self.nodes > self.limits.max_nodes {
			return Err(Error::malformed(
				path,
				format!("expression exceeds the limit of {} nodes.", self.limits.max_nodes),
			));
		}

		match expression {
			Expression::And(parts) => {
				let parts = self.visit_all(parts, path, "AND", depth)?;

				Ok(Predicate::and(parts))
			},
			Expression::Or(parts) => {
				let parts = self.visit_all(parts, path, "OR", depth)?;

				Ok(Predicate::or(parts))
			},
			Expression::Not(inner) =>
				Ok(self.visit(inner, &format!("{path}.NOT"), depth + 1)?.negate()),
			Expression::Equals(leaf) | Expression::Is(leaf) => self.compare(path, leaf, Op::Eq),
			Expression::NotEquals(leaf) => self.compare(path, leaf, Op::Ne),
			Expression::StartsWith(leaf) => self.compare(path, leaf, Op::StartsWith),
			Expression::EndsWith(leaf) => self.compare(path, leaf, Op::EndsWith),
			Expression::Contains(leaf) => self.compare(path, leaf, Op::Contains),
			Expression::After(leaf) | Expression::Greater(leaf) => self.compare(path, leaf, Op::After),
			Expression::Before(leaf) | Expression::Less(leaf) => self.compare(path, leaf, Op::Before),
			Expression::GreaterOrEqual(leaf) => self.compare(path, leaf, Op::Ge),
			Expression::LessOrEqual(leaf) => self.compare(path, leaf, Op::Le),
			Expression::From(leaf) => self.from(path, leaf),
			Expression::IsEmpty(leaf) => self.emptiness(path, &leaf.field, true, true),
			Expression::IsNotEmpty(leaf) => self.emptiness(path, &leaf.field, true, false),
			Expression::IsNull(leaf) => self.emptiness(path, &leaf.field, false, true),
			Expression::IsNotNull(leaf) => self.emptiness(path, &leaf.field, false, false),
			Expression::Find(find) => self.find(path, find, depth),
		}
	}

	fn visit_all(
		&mut self,
		parts: &[Expression],
		path: &str,
		label: &str,
		depth: usize,
	) -> Result<Vec<Predicate>> {
		if parts.is_empty() {
			return Err(Error::malformed(path, format!("{label} needs at least one operand.")));
		}

		parts
			.iter()
			.enumerate()
			.map(|(index, part)| self.visit(part, &format!("{path}.{label}[{index}]"), depth + 1))
			.collect()
	}

	fn resolve(&self, path: &str, raw: &str) -> Result<ResolvedField> {
		let resolved = self.resolver.resolve(self.base, raw)?;
		let Some(scope) = &self.find else {
			return Ok(resolved);
		};
		let field = resolved.field();
		let shared = field.steps.len() >= scope.steps.len()
			&& field
				.steps
				.iter()
				.zip(&scope.steps)
				.all(|(step, scoped)| step.association == scoped.association);

		if !shared {
			return Err(Error::malformed(
				path,
				format!("{raw} is not on the association searched by FIND."),
			));
		}

		let depth = scope.steps.len();

		Ok(match resolved {
			ResolvedField::Column(field) => ResolvedField::Column(field.strip_steps(depth)),
			ResolvedField::Flag { field, equals } =>
				ResolvedField::Flag { field: field.strip_steps(depth), equals },
		})
	}

	fn compare(&self, path: &str, leaf: &FieldValue, op: Op) -> Result<Predicate> {
		match self.resolve(path, &leaf.field)? {
			ResolvedField::Flag { field, equals } => flag(path, field, equals, op, &leaf.value),
			ResolvedField::Column(field) if field.column_type.is_temporal() => {
				let range = self.range(path, &leaf.value)?;

				self.temporal(field, op, range, path)
			},
			ResolvedField::Column(field) => {
				let value = literal(path, field.column_type, &leaf.value)?;
				let cmp = match op {
					Op::Eq => CmpOp::Eq,
					Op::Ne => CmpOp::Ne,
					Op::After => CmpOp::Gt,
					Op::Before => CmpOp::Lt,
					Op::Ge => CmpOp::Ge,
					Op::Le => CmpOp::Le,
					// A has-many CONTAINS asks whether some related row holds the value.
					Op::Contains if field.crosses_has_many() => CmpOp::Eq,
					Op::StartsWith | Op::EndsWith | Op::Contains
						if field.column_type != ColumnType::String =>
						return Err(Error::malformed(
							path,
							format!("{} needs a string field, {} is not one.", op.name(), leaf.field),
						)),
					Op::StartsWith => CmpOp::StartsWith,
					Op::EndsWith => CmpOp::EndsWith,
					Op::Contains => CmpOp::Contains,
				};

				Ok(Predicate::compare(field, cmp, value))
			},
		}
	}

	fn from(&self, path: &str, leaf: &FieldValue) -> Result<Predicate> {
		let bounds = match &leaf.value {
			Value::Array(items) if items.len() == 2 => items,
			_ => return Err(Error::malformed(path, "FROM needs a two element value.")),
		};
		let ResolvedField::Column(field) = self.resolve(path, &leaf.field)? else {
			return Err(Error::malformed(path, "FROM needs a date or time field."));
		};

		if field.column_type.is_temporal() {
			let range = self.range(path, &bounds[0])?.span(self.range(path, &bounds[1])?);

			return self.temporal(field, Op::Eq, range, path);
		}

		let low = literal(path, field.column_type, &bounds[0])?;
		let high = literal(path, field.column_type, &bounds[1])?;
		let (low, high) = match low.compare(&high) {
			Some(std::cmp::Ordering::Greater) => (high, low),
			_ => (low, high),
		};

		Ok(Predicate::and([
			Predicate::compare(field.clone(), CmpOp::Ge, low),
			Predicate::compare(field, CmpOp::Le, high),
		]))
	}

	fn range(&self, path: &str, value: &Value) -> Result<TimeRange> {
		let Some(raw) = value.as_str() else {
			return Err(Error::malformed(path, "date values must be strings."));
		};

		self.dates
			.resolve(raw)
			.ok_or_else(|| Error::malformed(path, format!("{raw} is not a date or relative date.")))
	}

	fn temporal(&self, field: FieldRef, op: Op, range: TimeRange, path: &str) -> Result<Predicate> {
		let (start, end) = if field.column_type == ColumnType::Date {
			let (first, last) = range.local_dates(self.tz());

			(AttrValue::Date(first), AttrValue::Date(last))
		} else {
			(AttrValue::DateTime(range.start), AttrValue::DateTime(range.end))
		};

		Ok(match op {
			Op::Eq => Predicate::and([
				Predicate::compare(field.clone(), CmpOp::Ge, start),
				Predicate::compare(field, CmpOp::Le, end),
			]),
			Op::Ne => Predicate::or([
				Predicate::compare(field.clone(), CmpOp::Lt, start),
				Predicate::compare(field, CmpOp::Gt, end),
			]),
			Op::After => Predicate::compare(field, CmpOp::Gt, end),
			Op::Before => Predicate::compare(field, CmpOp::Lt, start),
			Op::Ge => Predicate::compare(field, CmpOp::Ge, start),
			Op::Le => Predicate::compare(field, CmpOp::Le, end),
			Op::StartsWith | Op::EndsWith | Op::Contains =>
				return Err(Error::malformed(path, format!("{} does not apply to dates.", op.name()))),
		})
	}

	fn tz(&self) -> &'a Tz {
		self.dates.tz
	}

	/// `blank` selects IS EMPTY over IS NULL. Negated forms over associations require some
	/// related row to be non-empty.
	fn emptiness(&self, path: &str, raw: &str, blank: bool, positive: bool) -> Result<Predicate> {
		let field = match self.resolve(path, raw)? {
			ResolvedField::Column(field) => field,
			ResolvedField::Flag { field, .. } => field,
		};
		let leaf = |field: FieldRef| {
			if blank && field.column_type == ColumnType::String {
				Predicate::IsEmpty(field)
			} else {
				Predicate::IsNull(field)
			}
		};

		if positive {
			return Ok(leaf(field));
		}
		if field.steps.is_empty() {
			return Ok(leaf(field).negate());
		}

		let steps = field.steps.clone();

		Ok(Predicate::Related {
			steps,
			quantifier: Quantifier::Any,
			search: Box::new(Predicate::True),
			check: Box::new(leaf(field.strip_steps(field.steps.len())).negate()),
		})
	}

	fn find(&mut self, path: &str, find: &Find, depth: usize) -> Result<Predicate> {
		if self.find.is_some() {
			return Err(Error::malformed(path, "FIND cannot be nested."));
		}

		let (check, quantifier) = match (&find.checkany, &find.checkall) {
			(Some(check), None) => (check, Quantifier::Any),
			(None, Some(check)) => (check, Quantifier::All),
			_ => return Err(Error::malformed(path, "FIND needs exactly one of checkany or checkall.")),
		};
		let steps = self.find_steps(path, find)?;

		self.find = Some(FindScope { steps: steps.clone() });

		let search = match &find.search {
			Some(search) => self.visit(search, &format!("{path}.FIND.search"), depth + 1),
			None => Ok(Predicate::True),
		};
		let checked = search.and_then(|search| {
			let label = if quantifier == Quantifier::Any { "checkany" } else { "checkall" };

			self.visit(check, &format!("{path}.FIND.{label}"), depth + 1)
				.map(|check| (search, check))
		});

		self.find = None;

		let (search, check) = checked?;

		Ok(Predicate::Related { steps, quantifier, search: Box::new(search), check: Box::new(check) })
	}

	/// The association every field inside `find` starts with: the steps of the field with the
	/// fewest, which all others must share.
	fn find_steps(&self, path: &str, find: &Find) -> Result<Vec<AssociationStep>> {
		let mut raw = Vec::new();

		for inner in [&find.search, &find.checkany, &find.checkall].into_iter().flatten() {
			inner.fields(&mut raw);
		}

		let mut shortest: Option<Vec<AssociationStep>> = None;

		for field in raw {
			let steps = self.resolver.resolve(self.base, field)?.field().steps.clone();

			if shortest.as_ref().is_none_or(|current| steps.len() < current.len()) {
				shortest = Some(steps);
			}
		}

		match shortest {
			Some(steps) if !steps.is_empty() => Ok(steps),
			_ => Err(Error::malformed(path, "FIND fields must reach through an association.")),
		}
	}
}

fn flag(path: &str, field: FieldRef, equals: AttrValue, op: Op, value: &Value) -> Result<Predicate> {
	let wanted = match literal(path, ColumnType::Boolean, value)? {
		AttrValue::Boolean(wanted) => wanted,
		_ => return Err(Error::malformed(path, "flag fields compare against true or false.")),
	};
	let wanted = match op {
		Op::Eq | Op::Contains => wanted,
		Op::Ne => !wanted,
		_ => return Err(Error::malformed(path, format!("{} does not apply to flags.", op.name()))),
	};

	Ok(if wanted {
		Predicate::compare(field, CmpOp::Eq, equals)
	} else {
		Predicate::or([Predicate::IsNull(field.clone()), Predicate::compare(field, CmpOp::Ne, equals)])
	})
}

/// Types a JSON literal for a column. Strings are accepted for every type.
fn literal(path: &str, column_type: ColumnType, value: &Value) -> Result<AttrValue> {
	let mismatch = || Error::malformed(path, format!("{value} is not a valid {column_type:?} value."));

	match (column_type, value) {
		(_, Value::Null) => Ok(AttrValue::Null),
		(ColumnType::String, Value::String(text)) => Ok(AttrValue::String(text.clone())),
		(ColumnType::String, Value::Number(_) | Value::Bool(_)) =>
			Ok(AttrValue::String(value.to_string())),
		(ColumnType::Integer, Value::Number(number)) =>
			number.as_i64().map(AttrValue::Integer).ok_or_else(mismatch),
		(ColumnType::Integer, Value::String(text)) =>
			text.trim().parse().map(AttrValue::Integer).map_err(|_| mismatch()),
		(ColumnType::Float, Value::Number(number)) =>
			number.as_f64().map(AttrValue::Float).ok_or_else(mismatch),
		(ColumnType::Float, Value::String(text)) =>
			text.trim().parse().map(AttrValue::Float).map_err(|_| mismatch()),
		(ColumnType::Boolean, Value::Bool(flag)) => Ok(AttrValue::Boolean(*flag)),
		(ColumnType::Boolean, Value::String(text)) => match text.trim().to_ascii_lowercase().as_str() {
			"true" => Ok(AttrValue::Boolean(true)),
			"false" => Ok(AttrValue::Boolean(false)),
			_ => Err(mismatch()),
		},
		_ => Err(mismatch()),
	}
}
