//! Planning and running searches.
//!
//! A search is planned into two predicates over the requested kind's table. The structural
//! predicate covers the kind family, explicit targets, the filter expression, and the named scope.
//! The authorized predicate adds the requester's access filters on top. `total_count` counts the
//! first, `auth_count` the second, and rows are only ever fetched through the second.

use std::collections::BTreeSet;

use serde::Serialize;
use time_tz::Tz;

use rbac_domain::{
	containment::BelongstoFilter,
	entity::{AttrValue, Entity},
	fields::FieldResolver,
	ids::{EntityId, TenantId},
	kinds::{AssociationLink, ColumnType, KindDescriptor, RbacMode},
	policy::Policy,
	predicate::{CmpOp, FieldRef, Predicate},
};
use rbac_storage::models::Page;

use crate::{
	Error, Result, ScopeEngine,
	dates::DateContext,
	expression::Evaluator,
	request::{DescendantMatch, ResultsFormat, SearchRequest, SearchResponse},
	requester::{Requester, RequesterScope},
	results::{self, ResultAssembler},
};

/// How a search narrows rows for its requester, reported in logs and plans.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
	ExplicitTargets,
	AssociatedKind,
	SelfService,
	UserGroup,
	Unscoped,
	/// The requester named an identity that does not resolve, so RBAC kinds yield nothing.
	Unresolved,
	Direct,
}
impl Strategy {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::ExplicitTargets => "explicit_targets",
			Self::AssociatedKind => "associated_kind",
			Self::SelfService => "self_service",
			Self::UserGroup => "user_group",
			Self::Unscoped => "unscoped",
			Self::Unresolved => "unresolved",
			Self::Direct => "direct",
		}
	}
}

#[derive(Clone, Debug)]
pub struct SearchPlan {
	pub kind: KindDescriptor,
	pub strategy: Strategy,
	pub structural: Predicate,
	pub authorized: Predicate,
	/// The requested ordering and window.
	pub page: Page,
	/// Set when results follow the order of explicit targets instead of a sort.
	pub target_order: Option<Vec<EntityId>>,
	pub results_format: ResultsFormat,
	pub effective_filters: Policy,
}
impl SearchPlan {
	/// The page handed to the repository. Target-ordered plans fetch every authorized row and
	/// page in memory.
	pub fn fetch_page(&self) -> Page {
		if self.target_order.is_some() { Page::all() } else { self.page.clone() }
	}
}

impl ScopeEngine {
	pub fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
		let plan = self.plan(request)?;

		self.execute(&plan)
	}

	pub fn plan(&self, request: &SearchRequest) -> Result<SearchPlan> {
		let kind = self.kinds.kind(&request.kind)?;

		if let Some(targets) = &request.targets
			&& targets.len() > self.cfg.search.max_targets as usize
		{
			return Err(Error::InvalidRequest {
				message: format!(
					"{} targets exceed the limit of {}.",
					targets.len(),
					self.cfg.search.max_targets
				),
			});
		}

		for key in &request.order {
			if kind.column(&key.column).is_none() {
				return Err(Error::InvalidRequest {
					message: format!("{} has no column {} to order by.", kind.name, key.column),
				});
			}
		}

		let requester =
			Requester::resolve(self.policies.as_ref(), request.user_id, request.group_id)?;

		if let Requester::Unresolved { reason } = &requester {
			tracing::warn!(kind = %kind.name, reason = %reason, "Requester cannot be resolved.");
		}

		let structural = self.structural(kind, request, &requester)?;
		let policy = self.authorization(kind, &requester, request.match_via_descendants.as_ref())?;
		let authorized = Predicate::and([structural.clone(), policy]);
		let strategy = self.strategy(kind, request, &requester);
		let target_order = match &request.targets {
			Some(targets) if request.order.is_empty() => Some(targets.clone()),
			_ => None,
		};
		let plan = SearchPlan {
			kind: kind.clone(),
			strategy,
			structural,
			authorized,
			page: Page {
				order: request.order.clone(),
				limit: request.limit,
				offset: request.offset,
			},
			target_order,
			results_format: request.results_format,
			effective_filters: requester.effective_filters(),
		};

		tracing::debug!(
			kind = %plan.kind.name,
			strategy = plan.strategy.as_str(),
			targets = request.targets.as_ref().map(Vec::len),
			policy_applies = !plan.effective_filters.is_empty(),
			nodes = plan.authorized.node_count(),
			"Search planned."
		);

		Ok(plan)
	}

	pub fn execute(&self, plan: &SearchPlan) -> Result<SearchResponse> {
		let assembler = ResultAssembler::new(plan.results_format, plan.effective_filters.clone());

		if plan.structural.is_false() {
			tracing::debug!(kind = %plan.kind.name, "Search has no candidate rows.");

			return Ok(assembler.empty());
		}

		let total_count = self.repository.count(&plan.kind, &plan.structural)?;
		let auth_count = if plan.authorized.is_false() {
			0
		} else {
			self.repository.count(&plan.kind, &plan.authorized)?
		};
		let rows = if auth_count == 0 {
			Vec::new()
		} else {
			self.repository.fetch(&plan.kind, &plan.authorized, &plan.fetch_page())?
		};
		let rows = match &plan.target_order {
			Some(targets) => results::paginate(
				results::order_by_targets(rows, targets),
				plan.page.offset,
				plan.page.limit,
			),
			None => rows,
		};

		tracing::debug!(
			kind = %plan.kind.name,
			total_count,
			auth_count,
			returned = rows.len(),
			"Search executed."
		);

		Ok(assembler.assemble(rows, total_count, auth_count))
	}

	/// Keeps the objects `request`'s requester may see, in their original order. The request's
	/// targets, ordering, and window are ignored.
	pub fn filtered(&self, objects: &[Entity], request: &SearchRequest) -> Result<Vec<Entity>> {
		if objects.is_empty() {
			return Ok(Vec::new());
		}

		let request = SearchRequest {
			targets: Some(objects.iter().map(|object| object.id).collect()),
			order: Vec::new(),
			limit: None,
			offset: 0,
			results_format: ResultsFormat::Ids,
			..request.clone()
		};
		let allowed: BTreeSet<EntityId> = self.search(&request)?.results.ids().into_iter().collect();

		Ok(objects.iter().filter(|object| allowed.contains(&object.id)).cloned().collect())
	}

	fn structural(
		&self,
		kind: &KindDescriptor,
		request: &SearchRequest,
		requester: &Requester,
	) -> Result<Predicate> {
		let mut parts = vec![Predicate::KindIn(self.kinds.family(kind.name)?)];

		if let Some(targets) = &request.targets {
			parts.push(Predicate::ids(targets.iter().copied()));
		}
		if request.filter.is_none() && request.named_scope.is_none() {
			return Ok(Predicate::and(parts));
		}

		let tz = self.timezone_for(requester);
		let dates = DateContext::new(self.clock.now(), tz, self.week_start);
		let mut evaluator =
			Evaluator::new(FieldResolver::new(&self.kinds), kind, dates, self.limits);

		if let Some(filter) = &request.filter {
			parts.push(evaluator.evaluate(filter)?);
		}
		if let Some(scope) = &request.named_scope {
			let expression = self.scopes.expression(&self.kinds, kind, scope)?;

			parts.push(evaluator.evaluate(&expression)?);
		}

		Ok(Predicate::and(parts))
	}

	/// The requester's timezone, else the configured default. Unknown requester zones fall back
	/// too.
	fn timezone_for(&self, requester: &Requester) -> &'static Tz {
		let Some(name) = requester.timezone() else {
			return self.default_tz;
		};

		match crate::timezone::resolve(name) {
			Ok(tz) => tz,
			Err(err) => {
				tracing::warn!(timezone = %name, error = %err, "Requester timezone is unknown.");

				self.default_tz
			},
		}
	}

	fn strategy(
		&self,
		kind: &KindDescriptor,
		request: &SearchRequest,
		requester: &Requester,
	) -> Strategy {
		if request.targets.is_some() {
			return Strategy::ExplicitTargets;
		}
		if request.match_via_descendants.is_some() || kind.applies_associated_rbac() {
			return Strategy::AssociatedKind;
		}

		let scope = match requester {
			Requester::Unresolved { .. } if kind.applies_rbac() => return Strategy::Unresolved,
			Requester::Scoped(scope) => scope,
			Requester::System | Requester::Unresolved { .. } => return Strategy::Unscoped,
		};

		if !kind.applies_rbac() {
			Strategy::Unscoped
		} else if kind.applies_user_group_rbac() {
			Strategy::UserGroup
		} else if scope.self_service && kind.has_ownership() {
			Strategy::SelfService
		} else {
			Strategy::Direct
		}
	}

	fn authorization(
		&self,
		kind: &KindDescriptor,
		requester: &Requester,
		descendants: Option<&DescendantMatch>,
	) -> Result<Predicate> {
		let scope = match requester {
			Requester::System => return Ok(Predicate::True),
			Requester::Unresolved { .. } if kind.applies_rbac() || descendants.is_some() =>
				return Ok(Predicate::False),
			Requester::Unresolved { .. } => return Ok(Predicate::True),
			Requester::Scoped(scope) => scope,
		};

		if let Some(descendants) = descendants {
			return self.descendant_filter(kind, descendants, scope);
		}

		match kind.capabilities.rbac {
			RbacMode::None => Ok(Predicate::True),
			RbacMode::UserGroup { .. } if scope.group.super_admin => Ok(Predicate::True),
			RbacMode::UserGroup { column } => Ok(Predicate::compare(
				FieldRef::local(column, ColumnType::Integer),
				CmpOp::Eq,
				AttrValue::Integer(scope.group.id.get() as i64),
			)),
			RbacMode::Associated { kind: related, foreign_key } => {
				let related = self.kinds.kind(related)?;

				Ok(Predicate::InSubquery {
					column: foreign_key.to_string(),
					table: related.table,
					select: "id".to_string(),
					filter: Box::new(self.authorized_rows(related, scope)?),
				})
			},
			RbacMode::Direct => self.direct_filter(kind, scope),
		}
	}

	/// Rows of `kind` are visible when some authorized row of the descendant kind points at them
	/// through a belongs-to association.
	fn descendant_filter(
		&self,
		kind: &KindDescriptor,
		descendants: &DescendantMatch,
		scope: &RequesterScope,
	) -> Result<Predicate> {
		let descendant = self.kinds.kind(&descendants.kind)?;
		let (target, column) = match kind.capabilities.rbac {
			RbacMode::Associated { kind: related, foreign_key } =>
				(self.kinds.kind(related)?, foreign_key),
			_ => (kind, "id"),
		};
		let resolver = FieldResolver::new(&self.kinds);
		let foreign_key = match &descendants.association {
			Some(name) => {
				let association = descendant.association(name).ok_or_else(|| {
					Error::UnknownField { kind: descendant.name.to_string(), field: name.clone() }
				})?;
				let reaches_target = self
					.kinds
					.get(association.target)
					.map(|reached| reached.table == target.table)
					.unwrap_or(false);

				match association.link {
					AssociationLink::BelongsTo { foreign_key } if reaches_target => foreign_key,
					_ =>
						return Err(Error::InvalidRequest {
							message: format!(
								"{}.{name} does not belong to {}.",
								descendant.name, target.name
							),
						}),
				}
			},
			None => resolver
				.belongs_to_link(descendant, target)
				.map(|(_, foreign_key)| foreign_key)
				.ok_or_else(|| Error::InvalidRequest {
					message: format!("{} has no association to {}.", descendant.name, target.name),
				})?,
		};

		Ok(Predicate::InSubquery {
			column: column.to_string(),
			table: descendant.table,
			select: foreign_key.to_string(),
			filter: Box::new(self.authorized_rows(descendant, scope)?),
		})
	}

	fn authorized_rows(&self, kind: &KindDescriptor, scope: &RequesterScope) -> Result<Predicate> {
		Ok(Predicate::and([
			Predicate::KindIn(self.kinds.family(kind.name)?),
			self.direct_filter(kind, scope)?,
		]))
	}

	/// Tenant scope, then either self-service ownership or the group's tag and containment
	/// filters. Axes a kind does not declare are skipped.
	fn direct_filter(&self, kind: &KindDescriptor, scope: &RequesterScope) -> Result<Predicate> {
		let root = TenantId(self.cfg.tenancy.root_tenant_id);
		let tenant = self
			.policies
			.tenants()?
			.visible(scope.tenant, kind.tenant_strategy(), root)
			.to_predicate();

		if scope.self_service && kind.has_ownership() {
			return Ok(Predicate::and([tenant, scope.ownership()]));
		}

		let tags =
			if kind.is_taggable() { scope.policy.managed.to_predicate() } else { Predicate::True };
		let belongsto = match kind.containment_role() {
			Some(role) => BelongstoFilter::compile(&scope.policy.belongsto, |segment| {
				self.kinds.is_containment_kind(segment)
			})
			.to_predicate(self.repository.containment()?, role),
			None => Predicate::True,
		};

		Ok(Predicate::and([tenant, tags, belongsto]))
	}
}
