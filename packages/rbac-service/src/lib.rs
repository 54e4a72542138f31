pub mod clock;
pub mod dates;
pub mod expression;
pub mod request;
pub mod requester;
pub mod results;
pub mod scopes;
pub mod search;
pub mod timezone;

mod error;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{Error, Result};
pub use expression::Expression;
pub use request::{DescendantMatch, ResultsFormat, SearchRequest, SearchResponse, SearchResults};
pub use requester::{Requester, RequesterScope};
pub use scopes::{NamedScopeRef, NamedScopes};
pub use search::{SearchPlan, Strategy};

use std::sync::Arc;

use time_tz::Tz;

use rbac_config::Config;
use rbac_domain::{kinds::KindRegistry, tenant::TenantStrategy};
use rbac_storage::{PolicyStore, Repository};

use crate::{dates::WeekStart, expression::Limits};

pub struct ScopeEngine {
	pub cfg: Config,
	pub kinds: KindRegistry,
	pub scopes: NamedScopes,
	pub repository: Arc<dyn Repository>,
	pub policies: Arc<dyn PolicyStore>,
	pub clock: Arc<dyn Clock>,
	default_tz: &'static Tz,
	week_start: WeekStart,
	limits: Limits,
}
impl ScopeEngine {
	/// Builds an engine over `kinds`, applying the configured per-kind tenant strategies.
	pub fn new(
		cfg: Config,
		mut kinds: KindRegistry,
		repository: Arc<dyn Repository>,
		policies: Arc<dyn PolicyStore>,
	) -> Result<Self> {
		for (kind, raw) in &cfg.tenancy.strategies {
			let strategy = TenantStrategy::parse(raw).ok_or_else(|| Error::InvalidRequest {
				message: format!("tenancy.strategies.{kind} has unknown strategy {raw}."),
			})?;

			kinds.override_tenant_strategy(kind, strategy)?;
		}

		let default_tz = timezone::resolve(&cfg.search.default_timezone)?;
		let week_start = WeekStart::parse(&cfg.search.week_start).ok_or_else(|| {
			Error::InvalidRequest {
				message: format!("search.week_start has unknown value {}.", cfg.search.week_start),
			}
		})?;
		let limits = Limits {
			max_depth: cfg.search.max_expression_depth as usize,
			max_nodes: cfg.search.max_expression_nodes as usize,
		};

		Ok(Self {
			cfg,
			kinds,
			scopes: NamedScopes::new(),
			repository,
			policies,
			clock: Arc::new(SystemClock),
			default_tz,
			week_start,
			limits,
		})
	}

	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	pub fn with_scopes(mut self, scopes: NamedScopes) -> Self {
		self.scopes = scopes;

		self
	}
}
