mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Config, Search, Service, Tenancy};

use std::{fs, path::Path};

pub const TENANT_STRATEGIES: [&str; 4] = ["descendants", "ancestors", "tenant_only", "none"];

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	parse(&raw).map_err(|err| match err {
		Error::ParseConfig { source, .. } =>
			Error::ParseConfig { path: path.to_path_buf(), source },
		other => other,
	})
}

pub fn parse(raw: &str) -> Result<Config> {
	let mut cfg: Config = toml::from_str(raw)
		.map_err(|err| Error::ParseConfig { path: Default::default(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}
	if cfg.search.default_timezone.trim().is_empty() {
		return Err(Error::Validation {
			message: "search.default_timezone must be non-empty.".to_string(),
		});
	}
	if !matches!(cfg.search.week_start.as_str(), "monday" | "sunday") {
		return Err(Error::Validation {
			message: "search.week_start must be one of monday or sunday.".to_string(),
		});
	}
	if cfg.search.max_expression_depth == 0 {
		return Err(Error::Validation {
			message: "search.max_expression_depth must be greater than zero.".to_string(),
		});
	}
	if cfg.search.max_expression_nodes == 0 {
		return Err(Error::Validation {
			message: "search.max_expression_nodes must be greater than zero.".to_string(),
		});
	}
	if cfg.search.max_targets == 0 {
		return Err(Error::Validation {
			message: "search.max_targets must be greater than zero.".to_string(),
		});
	}

	for (kind, strategy) in &cfg.tenancy.strategies {
		if kind.trim().is_empty() {
			return Err(Error::Validation {
				message: "tenancy.strategies keys must be non-empty kind names.".to_string(),
			});
		}
		if !TENANT_STRATEGIES.contains(&strategy.as_str()) {
			return Err(Error::Validation {
				message: format!(
					"tenancy.strategies.{kind} must be one of descendants, ancestors, tenant_only, or none."
				),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.service.log_level = cfg.service.log_level.trim().to_string();
	cfg.search.default_timezone = cfg.search.default_timezone.trim().to_string();
	cfg.search.week_start = cfg.search.week_start.trim().to_ascii_lowercase();

	for strategy in cfg.tenancy.strategies.values_mut() {
		*strategy = strategy.trim().to_ascii_lowercase();
	}
}
