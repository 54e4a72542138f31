use std::{
	cmp::Ordering,
	collections::{BTreeMap, BTreeSet},
};

use serde::{Serialize, Serializer};
use serde_json::Value;
use time::{
	Date, OffsetDateTime, format_description::well_known::Rfc3339, macros::format_description,
};

use crate::{
	Error, Result,
	ids::{EntityId, GroupId, NodeId, TenantId, UserId},
	kinds::ColumnType,
};

#[derive(Clone, Debug, PartialEq)]
pub enum AttrValue {
	Null,
	String(String),
	Integer(i64),
	Float(f64),
	Boolean(bool),
	Date(Date),
	DateTime(OffsetDateTime),
}
impl AttrValue {
	/// Converts a JSON value into the typed value a column of `column_type` stores.
	pub fn coerce(name: &str, raw: &Value, column_type: ColumnType) -> Result<Self> {
		let invalid = |message: &str| Error::InvalidAttribute {
			name: name.to_string(),
			message: message.to_string(),
		};

		if raw.is_null() {
			return Ok(Self::Null);
		}

		match column_type {
			ColumnType::String => raw
				.as_str()
				.map(|s| Self::String(s.to_string()))
				.ok_or_else(|| invalid("expected a string.")),
			ColumnType::Integer =>
				raw.as_i64().map(Self::Integer).ok_or_else(|| invalid("expected an integer.")),
			ColumnType::Float =>
				raw.as_f64().map(Self::Float).ok_or_else(|| invalid("expected a number.")),
			ColumnType::Boolean =>
				raw.as_bool().map(Self::Boolean).ok_or_else(|| invalid("expected a boolean.")),
			ColumnType::Date => {
				let text = raw.as_str().ok_or_else(|| invalid("expected a YYYY-MM-DD string."))?;

				parse_date(text).map(Self::Date).ok_or_else(|| invalid("expected a YYYY-MM-DD string."))
			},
			ColumnType::DateTime => {
				let text = raw.as_str().ok_or_else(|| invalid("expected an RFC 3339 timestamp."))?;

				OffsetDateTime::parse(text, &Rfc3339)
					.map(Self::DateTime)
					.map_err(|_| invalid("expected an RFC 3339 timestamp."))
			},
		}
	}

	pub fn is_null(&self) -> bool {
		matches!(self, Self::Null)
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::String(s) => Some(s.as_str()),
			_ => None,
		}
	}

	pub fn as_i64(&self) -> Option<i64> {
		match self {
			Self::Integer(value) => Some(*value),
			_ => None,
		}
	}

	/// Orders two non-null values of compatible types. Integers and floats compare numerically;
	/// any other mix is incomparable.
	pub fn compare(&self, other: &Self) -> Option<Ordering> {
		match (self, other) {
			(Self::String(a), Self::String(b)) => Some(a.cmp(b)),
			(Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
			(Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
			(Self::Integer(a), Self::Float(b)) => (*a as f64).partial_cmp(b),
			(Self::Float(a), Self::Integer(b)) => a.partial_cmp(&(*b as f64)),
			(Self::Boolean(a), Self::Boolean(b)) => Some(a.cmp(b)),
			(Self::Date(a), Self::Date(b)) => Some(a.cmp(b)),
			(Self::DateTime(a), Self::DateTime(b)) => Some(a.cmp(b)),
			_ => None,
		}
	}
}
impl From<&str> for AttrValue {
	fn from(value: &str) -> Self {
		Self::String(value.to_string())
	}
}
impl From<i64> for AttrValue {
	fn from(value: i64) -> Self {
		Self::Integer(value)
	}
}
impl From<bool> for AttrValue {
	fn from(value: bool) -> Self {
		Self::Boolean(value)
	}
}
impl Serialize for AttrValue {
	fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		match self {
			Self::Null => serializer.serialize_none(),
			Self::String(s) => serializer.serialize_str(s),
			Self::Integer(value) => serializer.serialize_i64(*value),
			Self::Float(value) => serializer.serialize_f64(*value),
			Self::Boolean(value) => serializer.serialize_bool(*value),
			Self::Date(date) => serializer.serialize_str(&date.to_string()),
			Self::DateTime(ts) => {
				let text = ts.format(&Rfc3339).map_err(serde::ser::Error::custom)?;

				serializer.serialize_str(&text)
			},
		}
	}
}

/// A row of some entity kind.
///
/// `containment_node` is the node standing for this entity in the structural containment tree,
/// when it has been placed there.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Entity {
	pub id: EntityId,
	pub kind: String,
	pub tenant_id: Option<TenantId>,
	pub owner_id: Option<UserId>,
	pub group_id: Option<GroupId>,
	pub containment_node: Option<NodeId>,
	pub tags: BTreeSet<String>,
	pub attributes: BTreeMap<String, AttrValue>,
}
impl Entity {
	pub fn new(id: u64, kind: impl Into<String>) -> Self {
		Self {
			id: EntityId(id),
			kind: kind.into(),
			tenant_id: None,
			owner_id: None,
			group_id: None,
			containment_node: None,
			tags: BTreeSet::new(),
			attributes: BTreeMap::new(),
		}
	}

	/// Reads a built-in or kind-specific column. Unset attributes read as null.
	pub fn value(&self, column: &str) -> AttrValue {
		let as_int = |value: Option<u64>| match value {
			Some(value) => AttrValue::Integer(value as i64),
			None => AttrValue::Null,
		};

		match column {
			"id" => AttrValue::Integer(self.id.0 as i64),
			"kind" => AttrValue::String(self.kind.clone()),
			"tenant_id" => as_int(self.tenant_id.map(|id| id.0)),
			"owner_id" => as_int(self.owner_id.map(|id| id.0)),
			"group_id" => as_int(self.group_id.map(|id| id.0)),
			"containment_node_id" => as_int(self.containment_node.map(|id| id.0)),
			_ => self.attributes.get(column).cloned().unwrap_or(AttrValue::Null),
		}
	}

	pub fn name(&self) -> Option<&str> {
		self.attributes.get("name").and_then(AttrValue::as_str)
	}
}

pub fn parse_date(text: &str) -> Option<Date> {
	Date::parse(text, format_description!("[year]-[month]-[day]")).ok()
}
