pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Unknown entity kind: {kind}.")]
	UnknownEntityKind { kind: String },
	#[error("Unknown field {field} on {kind}.")]
	UnknownField { kind: String, field: String },
	#[error("Unknown association {association} on {kind}.")]
	UnknownAssociation { kind: String, association: String },
	#[error("Invalid attribute {name}: {message}")]
	InvalidAttribute { name: String, message: String },
	#[error("Invalid tenant tree: {message}")]
	InvalidTenantTree { message: String },
	#[error("Invalid containment tree: {message}")]
	InvalidContainmentTree { message: String },
	#[error("Invalid kind catalog: {message}")]
	InvalidCatalog { message: String },
}
