//! Named scopes: reusable, parameterized filter fragments registered per entity kind.

use std::{collections::BTreeMap, fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use rbac_domain::kinds::{KindDescriptor, KindRegistry};

use crate::{Error, Result, expression::Expression};

pub type ScopeFn = Arc<dyn Fn(&[Value]) -> Result<Expression> + Send + Sync>;

/// A scope invocation as it appears in a request.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct NamedScopeRef {
	pub name: String,
	#[serde(default)]
	pub args: Vec<Value>,
}

#[derive(Clone, Default)]
pub struct NamedScopes {
	scopes: BTreeMap<(String, String), ScopeFn>,
}
impl NamedScopes {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `name` on `kind`. Subkinds inherit scopes registered on their base kind.
	pub fn register<F>(&mut self, kind: &str, name: &str, build: F)
	where
		F: Fn(&[Value]) -> Result<Expression> + Send + Sync + 'static,
	{
		self.scopes.insert((kind.to_string(), name.to_string()), Arc::new(build));
	}

	/// Builds the expression for `scope` on `kind`, looking through base kinds.
	pub fn expression(
		&self,
		registry: &KindRegistry,
		kind: &KindDescriptor,
		scope: &NamedScopeRef,
	) -> Result<Expression> {
		let mut current = Some(kind);

		while let Some(descriptor) = current {
			if let Some(build) = self.scopes.get(&(descriptor.name.to_string(), scope.name.clone())) {
				return build(&scope.args);
			}

			current = descriptor.base.and_then(|base| registry.get(base));
		}

		Err(Error::UnknownNamedScope { kind: kind.name.to_string(), name: scope.name.clone() })
	}
}
impl fmt::Debug for NamedScopes {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.scopes.keys()).finish()
	}
}

/// Reads a single argument, failing with an invalid request when it is missing.
pub fn single_arg<'a>(name: &str, args: &'a [Value]) -> Result<&'a Value> {
	match args {
		[value] => Ok(value),
		_ => Err(Error::InvalidRequest {
			message: format!("Named scope {name} takes exactly one argument, got {}.", args.len()),
		}),
	}
}
