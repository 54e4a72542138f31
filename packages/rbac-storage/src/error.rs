#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Storage unavailable: {0}")]
	Unavailable(String),
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Invalid fixture: {0}")]
	Fixture(#[from] serde_json::Error),
	#[error(transparent)]
	Domain(#[from] rbac_domain::Error),
}
