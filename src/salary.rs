use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::cache::{CacheStore, TtlCache};
use crate::data::ExperienceLevel;
use crate::http::{FetchError, JsonFetcher};

pub const PHILIPPINES: &str = "Philippines";
pub const UNITED_STATES: &str = "United States";

/// Countries with salary coverage, and the currency their figures are in.
pub const SUPPORTED_COUNTRIES: &[(&str, &str)] = &[
    ("Australia", "AUD"),
    ("Canada", "CAD"),
    ("United Kingdom", "GBP"),
    ("New Zealand", "NZD"),
    ("Singapore", "SGD"),
    (PHILIPPINES, "PHP"),
    (UNITED_STATES, "USD"),
];

pub fn is_supported_country(country: &str) -> bool {
    SUPPORTED_COUNTRIES.iter().any(|(name, _)| *name == country)
}

pub fn country_currency(country: &str) -> Option<&'static str> {
    SUPPORTED_COUNTRIES
        .iter()
        .find(|(name, _)| *name == country)
        .map(|(_, currency)| *currency)
}

/// Unsupported countries are priced as the United States.
pub fn effective_country(country: &str) -> &str {
    if is_supported_country(country) {
        country
    } else {
        UNITED_STATES
    }
}

/// Annual figures in local currency; `total` includes employer on-costs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SalaryBand {
    pub base: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RoleSalary {
    pub entry: SalaryBand,
    pub moderate: SalaryBand,
    pub experienced: SalaryBand,
}

impl RoleSalary {
    pub fn band(&self, level: ExperienceLevel) -> SalaryBand {
        match level {
            ExperienceLevel::Entry => self.entry,
            ExperienceLevel::Moderate => self.moderate,
            ExperienceLevel::Experienced => self.experienced,
        }
    }
}

pub trait SalarySource: Send + Sync {
    fn has_role(&self, role_id: &str) -> bool;

    /// Exact lookup, no country substitution.
    fn role_salary(&self, role_id: &str, country: &str) -> Option<RoleSalary>;

    /// Salary for a role in a country, substituting United States data for
    /// countries outside the supported set. `None` only for unknown roles.
    fn role_salary_for_country(&self, role_id: &str, country: &str) -> Option<RoleSalary> {
        if !self.has_role(role_id) {
            return None;
        }
        self.role_salary(role_id, effective_country(country))
    }
}

#[derive(Debug, Error)]
pub enum SalaryDataError {
    #[error("salary data for role '{role}' has no {country} entry")]
    MissingCountry { role: String, country: String },
    #[error("salary data could not be fetched: {0}")]
    Fetch(#[from] FetchError),
    #[error("salary data has an unexpected shape: {0}")]
    Parse(#[from] serde_json::Error),
}

/// role -> country -> per-level salary bands
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct SalaryTable {
    roles: BTreeMap<String, BTreeMap<String, RoleSalary>>,
}

impl SalaryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, role_id: &str, country: &str, salary: RoleSalary) {
        self.roles
            .entry(role_id.to_string())
            .or_default()
            .insert(country.to_string(), salary);
    }

    pub fn role_ids(&self) -> impl Iterator<Item = &str> {
        self.roles.keys().map(String::as_str)
    }

    /// Every role must be priceable offshore and have the fallback country.
    pub fn validate(&self) -> Result<(), SalaryDataError> {
        for (role, countries) in &self.roles {
            for required in [PHILIPPINES, UNITED_STATES] {
                if !countries.contains_key(required) {
                    return Err(SalaryDataError::MissingCountry {
                        role: role.clone(),
                        country: required.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Salary guide figures bundled with the calculator.
    pub fn builtin() -> Self {
        let mut table = Self::new();
        for (role_id, rows) in BUILTIN_BASES {
            for (country, bases) in rows.iter() {
                let on_cost = on_cost_factor(country);
                let band = |base: f64| SalaryBand {
                    base,
                    total: (base * on_cost).round(),
                };
                table.insert(
                    role_id,
                    country,
                    RoleSalary {
                        entry: band(bases[0]),
                        moderate: band(bases[1]),
                        experienced: band(bases[2]),
                    },
                );
            }
        }
        table
    }
}

impl SalarySource for SalaryTable {
    fn has_role(&self, role_id: &str) -> bool {
        self.roles.contains_key(role_id)
    }

    fn role_salary(&self, role_id: &str, country: &str) -> Option<RoleSalary> {
        self.roles.get(role_id)?.get(country).copied()
    }
}

/// Superannuation, pension and statutory bonus loadings.
fn on_cost_factor(country: &str) -> f64 {
    match country {
        "Australia" => 1.12,
        "Canada" => 1.08,
        "United Kingdom" => 1.10,
        "New Zealand" => 1.03,
        "Singapore" => 1.17,
        PHILIPPINES => 1.13,
        _ => 1.12,
    }
}

type BaseRow = (&'static str, [f64; 3]);

// entry, moderate, experienced base salaries
const BUILTIN_BASES: &[(&str, [BaseRow; 7])] = &[
    (
        "assistant_property_manager",
        [
            ("Australia", [60_000.0, 70_000.0, 85_000.0]),
            ("Canada", [45_000.0, 55_000.0, 68_000.0]),
            ("United Kingdom", [24_000.0, 29_000.0, 36_000.0]),
            ("New Zealand", [55_000.0, 63_000.0, 75_000.0]),
            ("Singapore", [38_000.0, 48_000.0, 62_000.0]),
            (PHILIPPINES, [300_000.0, 420_000.0, 600_000.0]),
            (UNITED_STATES, [42_000.0, 52_000.0, 65_000.0]),
        ],
    ),
    (
        "leasing_coordinator",
        [
            ("Australia", [55_000.0, 65_000.0, 78_000.0]),
            ("Canada", [42_000.0, 50_000.0, 60_000.0]),
            ("United Kingdom", [23_000.0, 27_000.0, 33_000.0]),
            ("New Zealand", [50_000.0, 58_000.0, 68_000.0]),
            ("Singapore", [36_000.0, 44_000.0, 55_000.0]),
            (PHILIPPINES, [264_000.0, 360_000.0, 480_000.0]),
            (UNITED_STATES, [40_000.0, 48_000.0, 58_000.0]),
        ],
    ),
    (
        "property_accountant",
        [
            ("Australia", [65_000.0, 80_000.0, 100_000.0]),
            ("Canada", [52_000.0, 64_000.0, 80_000.0]),
            ("United Kingdom", [28_000.0, 35_000.0, 45_000.0]),
            ("New Zealand", [58_000.0, 70_000.0, 88_000.0]),
            ("Singapore", [45_000.0, 58_000.0, 75_000.0]),
            (PHILIPPINES, [360_000.0, 540_000.0, 780_000.0]),
            (UNITED_STATES, [50_000.0, 62_000.0, 80_000.0]),
        ],
    ),
    (
        "maintenance_coordinator",
        [
            ("Australia", [55_000.0, 66_000.0, 80_000.0]),
            ("Canada", [44_000.0, 52_000.0, 62_000.0]),
            ("United Kingdom", [24_000.0, 28_000.0, 34_000.0]),
            ("New Zealand", [52_000.0, 60_000.0, 70_000.0]),
            ("Singapore", [36_000.0, 45_000.0, 56_000.0]),
            (PHILIPPINES, [276_000.0, 384_000.0, 516_000.0]),
            (UNITED_STATES, [42_000.0, 50_000.0, 60_000.0]),
        ],
    ),
    (
        "admin_assistant",
        [
            ("Australia", [50_000.0, 58_000.0, 68_000.0]),
            ("Canada", [38_000.0, 45_000.0, 53_000.0]),
            ("United Kingdom", [21_000.0, 24_000.0, 28_000.0]),
            ("New Zealand", [46_000.0, 52_000.0, 60_000.0]),
            ("Singapore", [30_000.0, 37_000.0, 45_000.0]),
            (PHILIPPINES, [216_000.0, 300_000.0, 396_000.0]),
            (UNITED_STATES, [35_000.0, 42_000.0, 50_000.0]),
        ],
    ),
];

/// Salary table served from a JSON endpoint, cached in a key-value store.
pub struct RemoteSalarySource<F, S> {
    fetcher: F,
    url: String,
    cache: TtlCache<S>,
}

impl<F: JsonFetcher, S: CacheStore> RemoteSalarySource<F, S> {
    pub fn new(fetcher: F, url: impl Into<String>, cache: TtlCache<S>) -> Self {
        Self {
            fetcher,
            url: url.into(),
            cache,
        }
    }

    fn cache_key(&self) -> String {
        format!("salary:{}", self.url)
    }

    pub async fn load(&self) -> Result<SalaryTable, SalaryDataError> {
        let key = self.cache_key();
        match self.cache.get::<SalaryTable>(&key) {
            Ok(Some(table)) => {
                tracing::debug!(url = %self.url, "Salary table served from cache");
                return Ok(table);
            }
            Ok(None) => {}
            Err(err) => tracing::warn!(error = %err, "Ignoring unreadable salary cache"),
        }

        let body = self.fetcher.get_json(&self.url).await?;
        let table: SalaryTable = serde_json::from_value(body)?;
        table.validate()?;

        if let Err(err) = self.cache.put(&key, &table) {
            tracing::warn!(error = %err, "Failed to cache salary table");
        }
        tracing::info!(url = %self.url, roles = table.roles.len(), "Loaded remote salary table");
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::MemoryCacheStore;
    use crate::http::testing::MockFetcher;
    use crate::roles::ROLES;

    #[test]
    fn test_builtin_covers_every_role_and_country() {
        let table = SalaryTable::builtin();
        table.validate().unwrap();
        for role in ROLES {
            for (country, _) in SUPPORTED_COUNTRIES {
                assert!(
                    table.role_salary(role.id, country).is_some(),
                    "{} missing {}",
                    role.id,
                    country
                );
            }
        }
    }

    #[test]
    fn test_unsupported_country_uses_united_states() {
        let table = SalaryTable::builtin();
        let brazil = table
            .role_salary_for_country("leasing_coordinator", "Brazil")
            .unwrap();
        let us = table
            .role_salary_for_country("leasing_coordinator", UNITED_STATES)
            .unwrap();
        assert_eq!(brazil, us);
        for level in ExperienceLevel::ALL {
            assert_eq!(brazil.band(level), us.band(level));
        }
    }

    #[test]
    fn test_unknown_role_returns_none() {
        let table = SalaryTable::builtin();
        assert!(table.role_salary_for_country("astronaut", "Australia").is_none());
        assert!(table.role_salary_for_country("astronaut", "Brazil").is_none());
    }

    #[test]
    fn test_builtin_totals_include_on_costs() {
        let table = SalaryTable::builtin();
        let salary = table.role_salary("admin_assistant", "Australia").unwrap();
        assert_eq!(salary.entry.base, 50_000.0);
        assert_eq!(salary.entry.total, 56_000.0);
    }

    #[test]
    fn test_validate_requires_philippines() {
        let mut table = SalaryTable::new();
        let band = SalaryBand {
            base: 1.0,
            total: 1.0,
        };
        let salary = RoleSalary {
            entry: band,
            moderate: band,
            experienced: band,
        };
        table.insert("admin_assistant", UNITED_STATES, salary);

        let err = table.validate().unwrap_err();
        assert!(matches!(
            err,
            SalaryDataError::MissingCountry { ref country, .. } if country == PHILIPPINES
        ));
    }

    #[test]
    fn test_country_currency() {
        assert_eq!(country_currency("New Zealand"), Some("NZD"));
        assert_eq!(country_currency("Brazil"), None);
        assert_eq!(effective_country("Brazil"), UNITED_STATES);
        assert_eq!(effective_country("Canada"), "Canada");
    }

    #[tokio::test]
    async fn test_remote_source_caches_table() {
        let body = serde_json::to_value(SalaryTable::builtin()).unwrap();
        let fetcher = MockFetcher::new().respond("salaries.json", body);
        let cache = TtlCache::new(MemoryCacheStore::new(), chrono::Duration::hours(24));
        let source = RemoteSalarySource::new(fetcher, "https://example.test/salaries.json", cache);

        let first = source.load().await.unwrap();
        let second = source.load().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first, SalaryTable::builtin());
        assert_eq!(source.fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_remote_source_rejects_incomplete_table() {
        let body = serde_json::json!({
            "admin_assistant": {
                "Australia": {
                    "entry": { "base": 1.0, "total": 1.0 },
                    "moderate": { "base": 1.0, "total": 1.0 },
                    "experienced": { "base": 1.0, "total": 1.0 }
                }
            }
        });
        let fetcher = MockFetcher::new().respond("salaries.json", body);
        let cache = TtlCache::new(MemoryCacheStore::new(), chrono::Duration::hours(24));
        let source = RemoteSalarySource::new(fetcher, "https://example.test/salaries.json", cache);

        let err = source.load().await.unwrap_err();
        assert!(matches!(err, SalaryDataError::MissingCountry { .. }));
    }
}
