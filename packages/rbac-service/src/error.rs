pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Malformed expression at {path}: {message}")]
	MalformedExpression { path: String, message: String },
	#[error("Unknown entity kind: {kind}.")]
	UnknownEntityKind { kind: String },
	#[error("Unknown field {field} on {kind}.")]
	UnknownField { kind: String, field: String },
	#[error("Unknown named scope {name} on {kind}.")]
	UnknownNamedScope { kind: String, name: String },
	#[error("Unknown timezone: {name}.")]
	UnknownTimezone { name: String },
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error(transparent)]
	Storage(#[from] rbac_storage::Error),
}
impl Error {
	pub(crate) fn malformed(path: &str, message: impl Into<String>) -> Self {
		Self::MalformedExpression { path: path.to_string(), message: message.into() }
	}
}

impl From<rbac_domain::Error> for Error {
	fn from(err: rbac_domain::Error) -> Self {
		match err {
			rbac_domain::Error::UnknownEntityKind { kind } => Self::UnknownEntityKind { kind },
			rbac_domain::Error::UnknownField { kind, field } => Self::UnknownField { kind, field },
			rbac_domain::Error::UnknownAssociation { kind, association } =>
				Self::UnknownField { kind, field: association },
			other => Self::InvalidRequest { message: other.to_string() },
		}
	}
}
