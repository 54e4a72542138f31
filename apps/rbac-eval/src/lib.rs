use std::{fs, path::PathBuf, sync::Arc};

use clap::Parser;
use color_eyre::eyre;
use serde::Serialize;
use serde_json::Value;

use rbac_config::Config;
use rbac_domain::{catalog, policy::Policy};
use rbac_service::{ScopeEngine, SearchPlan, SearchRequest, Strategy};
use rbac_storage::{fixture::Fixture, schema, sql};

#[derive(Debug, Parser)]
#[command(
	version = rbac_cli::VERSION,
	rename_all = "kebab",
	styles = rbac_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// Inventory snapshot: tenants, groups, users, containment nodes, and entities.
	#[arg(long, short = 'f', value_name = "FILE", required_unless_present = "schema")]
	pub fixture: Option<PathBuf>,
	/// Search request as JSON.
	#[arg(long, short = 'r', value_name = "FILE", required_unless_present = "schema")]
	pub request: Option<PathBuf>,
	/// Print the planned SQL instead of running the search.
	#[arg(long)]
	pub sql: bool,
	/// Print the Postgres schema for the built-in kinds and exit.
	#[arg(long, conflicts_with_all = ["fixture", "request", "sql"])]
	pub schema: bool,
}

#[derive(Debug, Serialize)]
pub struct PlanOutput {
	pub kind: String,
	pub strategy: Strategy,
	pub total_sql: String,
	pub auth_sql: String,
	pub fetch_sql: String,
	pub effective_filters: Policy,
}

pub fn run(args: Args) -> color_eyre::Result<()> {
	let cfg = rbac_config::load(&args.config)?;

	rbac_cli::init_tracing(&cfg.service.log_level)?;

	if args.schema {
		print!("{}", schema::render_schema(&catalog::registry()?));

		return Ok(());
	}

	let (Some(fixture), Some(request)) = (&args.fixture, &args.request) else {
		return Err(eyre::eyre!("--fixture and --request are required."));
	};
	let fixture = fs::read_to_string(fixture)?;
	let request = fs::read_to_string(request)?;
	let output = evaluate(cfg, &fixture, &request, args.sql)?;

	println!("{}", serde_json::to_string_pretty(&output)?);

	Ok(())
}

/// Runs `request` against the inventory in `fixture`, or plans it when `plan_only` is set.
pub fn evaluate(
	cfg: Config,
	fixture: &str,
	request: &str,
	plan_only: bool,
) -> color_eyre::Result<Value> {
	let kinds = catalog::registry()?;
	let (repository, policies) = Fixture::from_json(fixture)?.into_stores(kinds.clone())?;
	let engine = ScopeEngine::new(cfg, kinds, Arc::new(repository), Arc::new(policies))?;
	let request: SearchRequest = serde_json::from_str(request)?;

	if plan_only {
		let plan = engine.plan(&request)?;

		return Ok(serde_json::to_value(plan_output(&plan)?)?);
	}

	let response = engine.search(&request)?;

	tracing::info!(
		kind = %request.kind,
		total_count = response.total_count,
		auth_count = response.auth_count,
		"Search evaluated."
	);

	Ok(serde_json::to_value(response)?)
}

pub fn plan_output(plan: &SearchPlan) -> color_eyre::Result<PlanOutput> {
	let total = sql::count_query(&plan.kind, &plan.structural);
	let auth = sql::count_query(&plan.kind, &plan.authorized);
	let fetch = sql::fetch_query(&plan.kind, &plan.authorized, &plan.fetch_page())?;

	Ok(PlanOutput {
		kind: plan.kind.name.to_string(),
		strategy: plan.strategy,
		total_sql: total.sql().to_string(),
		auth_sql: auth.sql().to_string(),
		fetch_sql: fetch.sql().to_string(),
		effective_filters: plan.effective_filters.clone(),
	})
}
