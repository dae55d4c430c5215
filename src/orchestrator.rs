use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::cache::{CacheStore, FileCacheStore, TtlCache};
use crate::config::AppConfig;
use crate::currency::{DirectRateClient, FallbackRates, FallbackTable, PersistentRates, RateProvider};
use crate::data::{CalculationResult, FormData};
use crate::engine::{ConversionRates, SavingsEngine};
use crate::http::HttpFetcher;
use crate::report;
use crate::roles::ROLES;
use crate::salary::{RemoteSalarySource, SalarySource, SalaryTable, SUPPORTED_COUNTRIES};

type LiveRates = PersistentRates<DirectRateClient<HttpFetcher>, Arc<FileCacheStore>>;

fn cache_store(config: &AppConfig) -> Arc<FileCacheStore> {
    Arc::new(FileCacheStore::new(&config.cache_dir))
}

fn live_rates(config: &AppConfig, store: Arc<FileCacheStore>) -> Result<LiveRates> {
    let fetcher =
        HttpFetcher::new(config.http_timeout()).context("Failed to build HTTP client")?;
    let client = DirectRateClient::new(fetcher).with_ttl(config.direct_rate_ttl());
    Ok(PersistentRates::new(
        client,
        TtlCache::new(store, config.rate_cache_ttl()),
    ))
}

/// Remote table when a URL is configured, otherwise the bundled one.
async fn salary_table(
    config: &AppConfig,
    salary_url: Option<&str>,
    store: Arc<FileCacheStore>,
) -> Result<SalaryTable> {
    let Some(url) = salary_url.or(config.salary_url.as_deref()) else {
        return Ok(SalaryTable::builtin());
    };
    let fetcher =
        HttpFetcher::new(config.http_timeout()).context("Failed to build HTTP client")?;
    let source = RemoteSalarySource::new(
        fetcher,
        url,
        TtlCache::new(store, config.salary_cache_ttl()),
    );
    source
        .load()
        .await
        .with_context(|| format!("Failed to load salary data from {url}"))
}

async fn run_engine<R: RateProvider>(
    config: &AppConfig,
    form: &FormData,
    salary: &dyn SalarySource,
    rates: &R,
) -> Result<CalculationResult> {
    let engine =
        SavingsEngine::new(salary, rates).with_lead_score_bands(config.lead_score.clone());
    let result = engine
        .calculate(form, None, None)
        .await
        .context("Savings calculation failed")?;
    Ok(result)
}

pub struct CalculateOptions<'a> {
    pub format: &'a str,
    pub salary_url: Option<&'a str>,
    pub offline: bool,
    /// Skip rate lookups and price with these.
    pub pinned_rates: Option<ConversionRates>,
}

/// Run a calculation for the form stored at `input`
pub async fn calculate(
    config: &AppConfig,
    input: &Path,
    options: &CalculateOptions<'_>,
) -> Result<()> {
    let content = fs::read_to_string(input)
        .with_context(|| format!("Failed to read form data: {:?}", input))?;
    let form: FormData = serde_json::from_str(&content)
        .with_context(|| format!("Invalid form data: {:?}", input))?;

    let store = cache_store(config);
    let salary = salary_table(config, options.salary_url, Arc::clone(&store)).await?;

    let result = if let Some(conversion) = options.pinned_rates {
        tracing::info!(
            php_to_usd = conversion.php_to_usd,
            usd_to_local = conversion.usd_to_local,
            "Using pinned exchange rates"
        );
        SavingsEngine::new(&salary, &())
            .with_lead_score_bands(config.lead_score.clone())
            .calculate_with_rates(&form, None, None, conversion)
            .context("Savings calculation failed")?
    } else if options.offline {
        tracing::info!("Using offline exchange rates");
        run_engine(config, &form, &salary, &FallbackTable::default()).await?
    } else if config.use_fallback_rates {
        let rates = FallbackRates::new(live_rates(config, store)?, FallbackTable::default());
        run_engine(config, &form, &salary, &rates).await?
    } else {
        let rates = live_rates(config, store)?;
        run_engine(config, &form, &salary, &rates).await?
    };

    println!("{}", report::render(&result, options.format)?);
    Ok(())
}

/// Print a live exchange rate
pub async fn show_rate(config: &AppConfig, from: &str, to: &str) -> Result<()> {
    let rates = live_rates(config, cache_store(config))?;
    let rate = rates
        .rate(from, to)
        .await
        .with_context(|| format!("Failed to get rate {from}->{to}"))?;
    println!("1 {} = {} {}", from.to_uppercase(), rate, to.to_uppercase());
    Ok(())
}

/// Print salary bands for a role in a country
pub async fn show_salary(
    config: &AppConfig,
    role_id: &str,
    country: &str,
    salary_url: Option<&str>,
) -> Result<()> {
    let table = salary_table(config, salary_url, cache_store(config)).await?;
    let salary = table
        .role_salary_for_country(role_id, country)
        .with_context(|| {
            let known: Vec<_> = table.role_ids().collect();
            format!("Unknown role: {role_id} (known: {})", known.join(", "))
        })?;
    println!("{}", serde_json::to_string_pretty(&salary)?);
    Ok(())
}

/// List the role catalogue
pub fn list_roles() {
    for role in ROLES {
        println!("{:<30} {}", role.id, role.title);
        println!("    {}", role.description);
        for task in role.tasks {
            println!(
                "    {:<26} {:<8} {}",
                task.id,
                task.complexity.as_str(),
                task.name
            );
        }
    }
    let countries: Vec<_> = SUPPORTED_COUNTRIES.iter().map(|(name, _)| *name).collect();
    println!("\nSupported countries: {}", countries.join(", "));
}

/// Remove every cached rate and salary table
pub fn clear_cache(config: &AppConfig) -> Result<()> {
    cache_store(config)
        .clear()
        .with_context(|| format!("Failed to clear cache: {:?}", config.cache_dir))?;
    println!("Cache cleared: {}", config.cache_dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheEntry;
    use tempfile::TempDir;

    fn test_config(temp_dir: &TempDir) -> AppConfig {
        AppConfig {
            cache_dir: temp_dir.path().join("cache"),
            ..AppConfig::default()
        }
    }

    #[tokio::test]
    async fn test_calculate_offline_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let input = temp_dir.path().join("form.json");
        fs::write(
            &input,
            serde_json::json!({
                "selected_roles": ["admin_assistant"],
                "team_size": { "admin_assistant": 2 },
                "portfolio_size": "1000-1999"
            })
            .to_string(),
        )
        .unwrap();

        let options = CalculateOptions {
            format: "md",
            salary_url: None,
            offline: true,
            pinned_rates: None,
        };
        calculate(&config, &input, &options).await.unwrap();
    }

    #[tokio::test]
    async fn test_calculate_with_pinned_rates() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let input = temp_dir.path().join("form.json");
        fs::write(&input, r#"{"selected_roles": ["property_accountant"]}"#).unwrap();

        let options = CalculateOptions {
            format: "json",
            salary_url: None,
            offline: false,
            pinned_rates: Some(ConversionRates {
                php_to_usd: 0.0178,
                usd_to_local: 1.52,
            }),
        };
        calculate(&config, &input, &options).await.unwrap();
    }

    #[tokio::test]
    async fn test_calculate_missing_input_errors() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        let options = CalculateOptions {
            format: "json",
            salary_url: None,
            offline: true,
            pinned_rates: None,
        };
        let result = calculate(&config, &temp_dir.path().join("nope.json"), &options).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_offline_engine_prices_builtin_roles() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let form = FormData {
            selected_roles: vec!["leasing_coordinator".into()],
            ..FormData::default()
        };

        let result = run_engine(
            &config,
            &form,
            &SalaryTable::builtin(),
            &FallbackTable::default(),
        )
        .await
        .unwrap();

        let role = &result.breakdown["leasing_coordinator"];
        assert_eq!(role.local_cost, 65_000.0);
        // 360k PHP at 37 PHP per AUD
        assert!((role.offshore_cost - 360_000.0 / 37.0).abs() < 1e-6);
        assert!(result.total_savings > 0.0);
    }

    #[tokio::test]
    async fn test_demo_form_prices_offline() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let form: FormData = serde_json::from_str(include_str!("../demos/form.json")).unwrap();

        let result = run_engine(
            &config,
            &form,
            &SalaryTable::builtin(),
            &FallbackTable::default(),
        )
        .await
        .unwrap();

        assert_eq!(result.currency, "AUD");
        assert_eq!(result.breakdown.len(), 2);
        assert_eq!(result.total_team_size, 3);
    }

    #[test]
    fn test_clear_cache_removes_files() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let store = cache_store(&config);
        let now = chrono::Utc::now();
        store
            .put(
                "rate:PHP:USD",
                &CacheEntry {
                    value: serde_json::json!(0.0178),
                    stored_at: now,
                    expires_at: now + chrono::Duration::hours(1),
                },
            )
            .unwrap();

        clear_cache(&config).unwrap();
        assert!(store.get("rate:PHP:USD").unwrap().is_none());
    }
}
