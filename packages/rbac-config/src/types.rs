use std::collections::BTreeMap;

use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub search: Search,
	#[serde(default)]
	pub tenancy: Tenancy,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Search {
	/// Used when the requester has no timezone of their own. Accepts IANA names and the
	/// display names used in user settings, e.g. "Eastern Time (US & Canada)".
	pub default_timezone: String,
	#[serde(default = "default_week_start")]
	pub week_start: String,
	#[serde(default = "default_max_expression_depth")]
	pub max_expression_depth: u32,
	#[serde(default = "default_max_expression_nodes")]
	pub max_expression_nodes: u32,
	#[serde(default = "default_max_targets")]
	pub max_targets: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Tenancy {
	pub root_tenant_id: u64,
	/// Optional. Map keys are entity kind names, values are one of descendants, ancestors,
	/// tenant_only, or none.
	#[serde(default)]
	pub strategies: BTreeMap<String, String>,
}
impl Default for Tenancy {
	fn default() -> Self {
		Self { root_tenant_id: 0, strategies: BTreeMap::new() }
	}
}

fn default_week_start() -> String {
	"monday".to_string()
}

fn default_max_expression_depth() -> u32 {
	16
}

fn default_max_expression_nodes() -> u32 {
	256
}

fn default_max_targets() -> u32 {
	10_000
}
