pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{0}")]
	Message(String),

	#[error(transparent)]
	Domain(#[from] rbac_domain::Error),

	#[error(transparent)]
	Storage(#[from] rbac_storage::Error),
}
