//! Savings calculation.
//!
//! A calculation runs in three steps: every selected role is resolved
//! against the role catalogue and salary data, the two exchange rates needed
//! to price Philippine salaries locally are fetched together, and the
//! breakdown is aggregated synchronously from those inputs.

use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

use crate::config::LeadScoreBands;
use crate::currency::{RateError, RateProvider};
use crate::data::{
    CalculationResult, ExperienceDistribution, ExperienceLevel, FormData, PortfolioIndicators,
    PortfolioTier, RoleBreakdown, UserLocation,
};
use crate::portfolio::derive_indicators;
use crate::risk::{assess_overall_risk, role_risk_factors, RiskSignals};
use crate::roles::{find_role, RoleDefinition};
use crate::salary::{
    country_currency, effective_country, RoleSalary, SalarySource, PHILIPPINES, UNITED_STATES,
};
use crate::scoring::{
    complexity_factor, estimated_roi, implementation_days, implementation_timeline, lead_score,
    savings_percentage, CUSTOM_TASK_MULTIPLIER,
};

pub const DEFAULT_COUNTRY: &str = "Australia";

#[derive(Debug, Error)]
pub enum CalculationError {
    #[error("unknown role '{0}'")]
    UnknownRole(String),
    #[error("no salary data for role '{role}' in {country}")]
    MissingSalaryData { role: String, country: String },
    #[error("exchange rate lookup failed: {0}")]
    ExchangeRate(#[from] RateError),
}

/// Country whose salaries are compared against, and its currency.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalMarket {
    pub country: String,
    pub currency: String,
}

impl LocalMarket {
    /// Missing location means Australia; unsupported countries are priced as
    /// the United States, in US dollars.
    pub fn resolve(location: Option<&UserLocation>) -> Self {
        let requested = location.map_or(DEFAULT_COUNTRY, |l| l.country.as_str());
        let country = effective_country(requested);
        let currency = country_currency(country).unwrap_or("USD");

        if let Some(location) = location {
            if country == UNITED_STATES && requested != UNITED_STATES {
                tracing::info!(requested = %requested, "No salary data for country, using United States");
            }
            if !location.currency.eq_ignore_ascii_case(currency) {
                tracing::debug!(
                    location_currency = %location.currency,
                    currency,
                    "Reporting in the salary data currency"
                );
            }
        }

        Self {
            country: country.to_string(),
            currency: currency.to_string(),
        }
    }
}

/// PHP is priced locally by way of USD.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConversionRates {
    pub php_to_usd: f64,
    pub usd_to_local: f64,
}

impl ConversionRates {
    /// Both pairs are requested concurrently.
    pub async fn fetch<R: RateProvider>(rates: &R, local_currency: &str) -> Result<Self, RateError> {
        let (php_to_usd, usd_to_local) =
            tokio::try_join!(rates.rate("PHP", "USD"), rates.rate("USD", local_currency))?;
        Ok(Self {
            php_to_usd,
            usd_to_local,
        })
    }

    pub fn php_to_local(&self, amount: f64) -> f64 {
        amount * self.php_to_usd * self.usd_to_local
    }
}

struct ResolvedRole<'f> {
    id: &'f str,
    definition: &'static RoleDefinition,
    local: RoleSalary,
    offshore: RoleSalary,
}

struct CostBasis<'f> {
    team_size: u32,
    level: ExperienceLevel,
    local_cost: f64,
    offshore_cost: f64,
    entry_members: u32,
    distribution: Option<&'f ExperienceDistribution>,
}

pub struct SavingsEngine<'a, R> {
    salary: &'a dyn SalarySource,
    rates: &'a R,
    bands: LeadScoreBands,
}

impl<'a, R> SavingsEngine<'a, R> {
    pub fn new(salary: &'a dyn SalarySource, rates: &'a R) -> Self {
        Self {
            salary,
            rates,
            bands: LeadScoreBands::default(),
        }
    }

    pub fn with_lead_score_bands(mut self, bands: LeadScoreBands) -> Self {
        self.bands = bands;
        self
    }

    /// Calculation with rates already known. No I/O.
    pub fn calculate_with_rates(
        &self,
        form: &FormData,
        indicators: Option<&PortfolioIndicators>,
        location: Option<&UserLocation>,
        conversion: ConversionRates,
    ) -> Result<CalculationResult, CalculationError> {
        let market = LocalMarket::resolve(location.or(form.user_location.as_ref()));
        let tier = resolve_tier(form, indicators);
        if form.selected_roles.is_empty() {
            return Ok(CalculationResult::zero(market.currency, tier));
        }
        let roles = self.resolve_roles(form, &market)?;
        Ok(self.aggregate(form, tier, &market, &roles, conversion))
    }

    fn resolve_roles<'f>(
        &self,
        form: &'f FormData,
        market: &LocalMarket,
    ) -> Result<Vec<ResolvedRole<'f>>, CalculationError> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::new();
        for id in form.selected_roles.iter().map(String::as_str) {
            if !seen.insert(id) {
                continue;
            }
            let definition =
                find_role(id).ok_or_else(|| CalculationError::UnknownRole(id.to_string()))?;
            let missing = |country: &str| CalculationError::MissingSalaryData {
                role: id.to_string(),
                country: country.to_string(),
            };
            let local = self
                .salary
                .role_salary_for_country(id, &market.country)
                .ok_or_else(|| missing(market.country.as_str()))?;
            let offshore = self
                .salary
                .role_salary(id, PHILIPPINES)
                .ok_or_else(|| missing(PHILIPPINES))?;
            resolved.push(ResolvedRole {
                id,
                definition,
                local,
                offshore,
            });
        }
        Ok(resolved)
    }

    fn aggregate(
        &self,
        form: &FormData,
        tier: PortfolioTier,
        market: &LocalMarket,
        roles: &[ResolvedRole<'_>],
        conversion: ConversionRates,
    ) -> CalculationResult {
        let mut breakdown = BTreeMap::new();
        let mut total_local_cost = 0.0;
        let mut total_offshore_cost = 0.0;
        let mut total_team_size = 0;
        let mut signals = RiskSignals {
            tier,
            max_complexity: 1.0,
            ..RiskSignals::default()
        };

        for role in roles {
            let basis = cost_basis(form, role, conversion);
            let role_breakdown = role_breakdown(form, role, &basis);

            total_local_cost += role_breakdown.local_cost;
            total_offshore_cost += role_breakdown.offshore_cost;
            total_team_size += role_breakdown.team_size;
            signals.entry_members += basis.entry_members;
            signals.max_complexity = signals.max_complexity.max(role_breakdown.task_complexity);
            signals.total_tasks +=
                role_breakdown.selected_tasks_count + role_breakdown.custom_tasks_count;

            tracing::debug!(
                role = %role.id,
                team_size = role_breakdown.team_size,
                savings = role_breakdown.savings,
                complexity = role_breakdown.task_complexity,
                "Role priced"
            );
            breakdown.insert(role.id.to_string(), role_breakdown);
        }
        signals.total_team_size = total_team_size;

        let total_savings = total_local_cost - total_offshore_cost;
        let result = CalculationResult {
            currency: market.currency.clone(),
            total_savings,
            total_local_cost,
            total_offshore_cost,
            breakdown,
            portfolio_tier: tier,
            lead_score: lead_score(
                &self.bands,
                tier,
                total_team_size,
                total_savings,
                signals.total_tasks,
            ),
            total_team_size,
            average_savings_percentage: savings_percentage(total_savings, total_local_cost),
            estimated_roi: estimated_roi(total_savings, total_offshore_cost),
            implementation_timeline: implementation_timeline(tier, total_team_size),
            risk_assessment: assess_overall_risk(&signals),
        };

        tracing::info!(
            roles = result.breakdown.len(),
            currency = %result.currency,
            total_savings = result.total_savings,
            lead_score = result.lead_score,
            "Savings calculated"
        );
        result
    }
}

impl<R: RateProvider> SavingsEngine<'_, R> {
    /// Full calculation. Salary coverage is checked before any rate lookup;
    /// with nothing selected no rates are fetched at all.
    pub async fn calculate(
        &self,
        form: &FormData,
        indicators: Option<&PortfolioIndicators>,
        location: Option<&UserLocation>,
    ) -> Result<CalculationResult, CalculationError> {
        let market = LocalMarket::resolve(location.or(form.user_location.as_ref()));
        let tier = resolve_tier(form, indicators);
        if form.selected_roles.is_empty() {
            return Ok(CalculationResult::zero(market.currency, tier));
        }

        let roles = self.resolve_roles(form, &market)?;
        let conversion = ConversionRates::fetch(self.rates, &market.currency).await?;
        Ok(self.aggregate(form, tier, &market, &roles, conversion))
    }
}

fn resolve_tier(form: &FormData, indicators: Option<&PortfolioIndicators>) -> PortfolioTier {
    indicators
        .map(|i| i.tier)
        .or_else(|| form.portfolio_size.as_deref().map(|s| derive_indicators(s).tier))
        .unwrap_or_default()
}

fn cost_basis<'f>(
    form: &'f FormData,
    role: &ResolvedRole<'_>,
    conversion: ConversionRates,
) -> CostBasis<'f> {
    match form.complete_distribution(role.id) {
        Some(dist) => {
            let mut local_cost = 0.0;
            let mut offshore_cost = 0.0;
            for level in ExperienceLevel::ALL {
                let count = dist.count(level) as f64;
                local_cost += role.local.band(level).base * count;
                offshore_cost += conversion.php_to_local(role.offshore.band(level).base) * count;
            }
            CostBasis {
                team_size: dist.members(),
                level: dist.weighted_level(),
                local_cost,
                offshore_cost,
                entry_members: dist.entry,
                distribution: Some(dist),
            }
        }
        None => {
            let level = form.legacy_level();
            let team_size = form.team_size_for(role.id);
            let headcount = team_size as f64;
            CostBasis {
                team_size,
                level,
                local_cost: role.local.band(level).base * headcount,
                offshore_cost: conversion.php_to_local(role.offshore.band(level).base) * headcount,
                entry_members: if level == ExperienceLevel::Entry {
                    team_size
                } else {
                    0
                },
                distribution: None,
            }
        }
    }
}

fn role_breakdown(form: &FormData, role: &ResolvedRole<'_>, basis: &CostBasis<'_>) -> RoleBreakdown {
    let selected = form.selected_tasks_for(role.id);
    let custom = form.custom_tasks_for(role.id);
    let total_tasks = selected.len() + custom.len();

    let predefined = selected.iter().map(|task_id| match role.definition.task(task_id) {
        Some(task) => task.complexity.multiplier(),
        None => {
            tracing::debug!(role = %role.id, task = %task_id, "Unknown task, treating as routine");
            1.0
        }
    });
    let task_complexity =
        complexity_factor(predefined.chain(custom.iter().map(|_| CUSTOM_TASK_MULTIPLIER)));

    // Offshore delivery cost scales with task complexity; local cost does not.
    let offshore_cost = basis.offshore_cost * task_complexity;
    let savings = basis.local_cost - offshore_cost;
    let experience_multiplier = basis
        .distribution
        .map_or(1.0, ExperienceDistribution::implementation_multiplier);

    RoleBreakdown {
        team_size: basis.team_size,
        experience_level: basis.level,
        local_cost: basis.local_cost,
        offshore_cost,
        savings,
        savings_percentage: savings_percentage(savings, basis.local_cost),
        selected_tasks_count: selected.len(),
        custom_tasks_count: custom.len(),
        task_complexity,
        estimated_implementation_time: implementation_days(
            basis.team_size,
            total_tasks,
            experience_multiplier,
        ),
        risk_factors: role_risk_factors(
            role.definition,
            basis.team_size,
            total_tasks,
            basis.distribution,
        ),
    }
}
