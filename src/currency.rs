use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::cache::{CacheStore, TtlCache};
use crate::http::JsonFetcher;

pub const DIRECT_RATE_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Error)]
pub enum RateError {
    #[error("all exchange rate providers failed for {from}->{to}: {}", .failures.join("; "))]
    AllProvidersFailed {
        from: String,
        to: String,
        failures: Vec<String>,
    },
    #[error("no exchange rate known for {from}->{to}")]
    Unknown { from: String, to: String },
}

/// Multiplicative rate: `amount_in_from * rate == amount_in_to`.
pub trait RateProvider: Send + Sync {
    fn rate(&self, from: &str, to: &str) -> impl Future<Output = Result<f64, RateError>> + Send;
}

fn normalize(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// One upstream rate API: how to address it and how to read its answer.
#[derive(Clone, Copy)]
pub struct RateEndpoint {
    pub name: &'static str,
    pub url: fn(&str, &str) -> String,
    pub parse: fn(&Value, &str, &str) -> Option<f64>,
}

fn rates_field(body: &Value, to: &str) -> Option<f64> {
    body.get("rates")?.get(to)?.as_f64()
}

/// Providers in priority order.
pub const DEFAULT_ENDPOINTS: &[RateEndpoint] = &[
    RateEndpoint {
        name: "open.er-api.com",
        url: |from, _| format!("https://open.er-api.com/v6/latest/{from}"),
        parse: |body, _, to| rates_field(body, to),
    },
    RateEndpoint {
        name: "frankfurter",
        url: |from, to| format!("https://api.frankfurter.app/latest?from={from}&to={to}"),
        parse: |body, _, to| rates_field(body, to),
    },
    RateEndpoint {
        name: "currency-api",
        url: |from, _| {
            format!(
                "https://cdn.jsdelivr.net/npm/@fawazahmed0/currency-api@latest/v1/currencies/{}.json",
                from.to_ascii_lowercase()
            )
        },
        parse: |body, from, to| {
            body.get(from.to_ascii_lowercase())?
                .get(to.to_ascii_lowercase())?
                .as_f64()
        },
    },
];

#[derive(Debug, Clone, Copy)]
struct CachedRate {
    rate: f64,
    fetched_at: Instant,
}

type Outcome = Option<Result<f64, RateError>>;

/// Per-pair state: a fresh value, or a lookup other callers can wait on.
enum Slot {
    Ready(CachedRate),
    InFlight(watch::Receiver<Outcome>),
}

enum Claim {
    Cached(f64),
    Wait(watch::Receiver<Outcome>),
    Lead(watch::Sender<Outcome>),
}

/// Live rates with a short in-memory cache. Concurrent lookups of the same
/// pair wait on a single upstream request and share its outcome, error
/// included.
pub struct DirectRateClient<F> {
    fetcher: F,
    endpoints: Vec<RateEndpoint>,
    ttl: Duration,
    slots: Mutex<HashMap<(String, String), Slot>>,
}

impl<F: JsonFetcher> DirectRateClient<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            endpoints: DEFAULT_ENDPOINTS.to_vec(),
            ttl: DIRECT_RATE_TTL,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    #[allow(dead_code)] // Used by long-lived embedders and tests
    pub fn clear(&self) {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// A fresh value, a lookup to wait on, or the job of running one.
    /// An in-flight slot whose leader went away is taken over.
    fn claim(&self, key: &(String, String)) -> Claim {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        match slots.get(key) {
            Some(Slot::Ready(cached)) if cached.fetched_at.elapsed() < self.ttl => {
                return Claim::Cached(cached.rate);
            }
            Some(Slot::InFlight(rx)) if rx.has_changed().is_ok() => {
                return Claim::Wait(rx.clone());
            }
            _ => {}
        }
        let (tx, rx) = watch::channel(None);
        slots.insert(key.clone(), Slot::InFlight(rx));
        Claim::Lead(tx)
    }

    /// Failures leave no slot behind, so the next call retries.
    fn settle(&self, key: (String, String), outcome: &Result<CachedRate, RateError>) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        match outcome {
            Ok(cached) => {
                slots.insert(key, Slot::Ready(*cached));
            }
            Err(_) => {
                slots.remove(&key);
            }
        }
    }

    async fn fetch(&self, from: &str, to: &str) -> Result<CachedRate, RateError> {
        let mut failures = Vec::new();
        for endpoint in &self.endpoints {
            let url = (endpoint.url)(from, to);
            match self.fetcher.get_json(&url).await {
                Ok(body) => match (endpoint.parse)(&body, from, to) {
                    Some(rate) if rate.is_finite() && rate > 0.0 => {
                        tracing::debug!(provider = endpoint.name, from, to, rate, "Fetched rate");
                        return Ok(CachedRate {
                            rate,
                            fetched_at: Instant::now(),
                        });
                    }
                    _ => failures.push(format!("{}: no usable rate in response", endpoint.name)),
                },
                Err(err) => {
                    tracing::warn!(provider = endpoint.name, from, to, error = %err, "Rate provider failed");
                    failures.push(format!("{}: {err}", endpoint.name));
                }
            }
        }
        Err(RateError::AllProvidersFailed {
            from: from.to_string(),
            to: to.to_string(),
            failures,
        })
    }
}

impl<F: JsonFetcher> RateProvider for DirectRateClient<F> {
    async fn rate(&self, from: &str, to: &str) -> Result<f64, RateError> {
        let (from, to) = (normalize(from), normalize(to));
        if from == to {
            return Ok(1.0);
        }
        let key = (from, to);
        loop {
            match self.claim(&key) {
                Claim::Cached(rate) => return Ok(rate),
                Claim::Wait(mut rx) => {
                    let outcome = match rx.wait_for(Option::is_some).await {
                        Ok(outcome) => outcome.clone(),
                        Err(_) => None,
                    };
                    if let Some(outcome) = outcome {
                        return outcome;
                    }
                    // leader dropped before finishing; take over
                }
                Claim::Lead(tx) => {
                    let outcome = self.fetch(&key.0, &key.1).await;
                    self.settle(key, &outcome);
                    let shared = outcome.map(|cached| cached.rate);
                    tx.send_replace(Some(shared.clone()));
                    return shared;
                }
            }
        }
    }
}

/// Long-lived rate cache in a key-value store in front of another provider.
pub struct PersistentRates<P, S> {
    inner: P,
    cache: TtlCache<S>,
}

impl<P: RateProvider, S: CacheStore> PersistentRates<P, S> {
    pub fn new(inner: P, cache: TtlCache<S>) -> Self {
        Self { inner, cache }
    }
}

impl<P: RateProvider, S: CacheStore> RateProvider for PersistentRates<P, S> {
    async fn rate(&self, from: &str, to: &str) -> Result<f64, RateError> {
        let (from, to) = (normalize(from), normalize(to));
        if from == to {
            return Ok(1.0);
        }
        let key = format!("rate:{from}:{to}");
        match self.cache.get::<f64>(&key) {
            Ok(Some(rate)) => return Ok(rate),
            Ok(None) => {}
            Err(err) => tracing::warn!(key = %key, error = %err, "Ignoring unreadable rate cache"),
        }

        let rate = self.inner.rate(&from, &to).await?;
        if let Err(err) = self.cache.put(&key, &rate) {
            tracing::warn!(key = %key, error = %err, "Failed to cache rate");
        }
        Ok(rate)
    }
}

/// Static pesos-per-unit table for when no live rate can be had.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackTable {
    php_per_unit: BTreeMap<String, f64>,
}

impl Default for FallbackTable {
    fn default() -> Self {
        Self::new([
            ("PHP", 1.0),
            ("USD", 56.0),
            ("AUD", 37.0),
            ("CAD", 41.5),
            ("GBP", 71.0),
            ("NZD", 34.0),
            ("SGD", 42.0),
            ("EUR", 61.0),
        ])
    }
}

impl FallbackTable {
    pub fn new<'a>(rates: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        Self {
            php_per_unit: rates
                .into_iter()
                .map(|(code, rate)| (normalize(code), rate))
                .collect(),
        }
    }

    pub fn lookup(&self, from: &str, to: &str) -> Result<f64, RateError> {
        let (from, to) = (normalize(from), normalize(to));
        if from == to {
            return Ok(1.0);
        }
        match (self.php_per_unit.get(&from), self.php_per_unit.get(&to)) {
            (Some(from_php), Some(to_php)) if *to_php > 0.0 => Ok(from_php / to_php),
            _ => Err(RateError::Unknown { from, to }),
        }
    }
}

impl RateProvider for FallbackTable {
    async fn rate(&self, from: &str, to: &str) -> Result<f64, RateError> {
        self.lookup(from, to)
    }
}

/// Answers from a static table when the inner provider fails.
pub struct FallbackRates<P> {
    inner: P,
    table: FallbackTable,
}

impl<P: RateProvider> FallbackRates<P> {
    pub fn new(inner: P, table: FallbackTable) -> Self {
        Self { inner, table }
    }
}

impl<P: RateProvider> RateProvider for FallbackRates<P> {
    async fn rate(&self, from: &str, to: &str) -> Result<f64, RateError> {
        match self.inner.rate(from, to).await {
            Ok(rate) => Ok(rate),
            Err(err) => match self.table.lookup(from, to) {
                Ok(rate) => {
                    tracing::warn!(from, to, rate, error = %err, "Using fallback exchange rate");
                    Ok(rate)
                }
                Err(_) => Err(err),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::MemoryCacheStore;
    use crate::http::testing::MockFetcher;

    fn er_api_body(to: &str, rate: f64) -> Value {
        serde_json::json!({ "result": "success", "rates": { to: rate } })
    }

    #[tokio::test]
    async fn test_rate_is_cached_within_ttl() {
        let fetcher = MockFetcher::new().respond("open.er-api.com", er_api_body("USD", 0.0178));
        let client = DirectRateClient::new(fetcher);

        let first = client.rate("PHP", "USD").await.unwrap();
        let second = client.rate("php", "usd").await.unwrap();

        assert_eq!(first, 0.0178);
        assert_eq!(second, 0.0178);
        assert_eq!(client.fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_requests_are_coalesced() {
        let fetcher = MockFetcher::new()
            .respond("open.er-api.com", er_api_body("AUD", 0.027))
            .with_delay(Duration::from_millis(20));
        let client = DirectRateClient::new(fetcher);

        let (a, b, c) = tokio::join!(
            client.rate("PHP", "AUD"),
            client.rate("PHP", "AUD"),
            client.rate("PHP", "AUD")
        );

        assert_eq!(a.unwrap(), 0.027);
        assert_eq!(b.unwrap(), 0.027);
        assert_eq!(c.unwrap(), 0.027);
        assert_eq!(client.fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_failures_share_one_lookup() {
        let fetcher = MockFetcher::new().with_delay(Duration::from_millis(20));
        let client = DirectRateClient::new(fetcher);

        let (a, b, c) = tokio::join!(
            client.rate("PHP", "AUD"),
            client.rate("PHP", "AUD"),
            client.rate("PHP", "AUD")
        );

        for result in [a, b, c] {
            match result {
                Err(RateError::AllProvidersFailed { failures, .. }) => {
                    assert_eq!(failures.len(), DEFAULT_ENDPOINTS.len())
                }
                other => panic!("unexpected result: {other:?}"),
            }
        }
        assert_eq!(client.fetcher.calls(), DEFAULT_ENDPOINTS.len());

        // nothing cached, so the next call retries once
        assert!(client.rate("PHP", "AUD").await.is_err());
        assert_eq!(client.fetcher.calls(), 2 * DEFAULT_ENDPOINTS.len());
    }

    #[tokio::test]
    async fn test_expired_rate_is_refetched() {
        let fetcher = MockFetcher::new().respond("open.er-api.com", er_api_body("USD", 0.0178));
        let client = DirectRateClient::new(fetcher).with_ttl(Duration::ZERO);

        client.rate("PHP", "USD").await.unwrap();
        client.rate("PHP", "USD").await.unwrap();

        assert_eq!(client.fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_falls_through_to_next_provider() {
        let fetcher = MockFetcher::new()
            .fail("open.er-api.com", 502)
            .respond("frankfurter", serde_json::json!({ "rates": { "GBP": 0.0139 } }));
        let client = DirectRateClient::new(fetcher);

        let rate = client.rate("PHP", "GBP").await.unwrap();
        assert_eq!(rate, 0.0139);
        assert_eq!(client.fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_currency_api_shape() {
        let fetcher = MockFetcher::new()
            .fail("open.er-api.com", 503)
            .fail("frankfurter", 503)
            .respond("currency-api", serde_json::json!({ "php": { "sgd": 0.024 } }));
        let client = DirectRateClient::new(fetcher);

        assert_eq!(client.rate("PHP", "SGD").await.unwrap(), 0.024);
    }

    #[tokio::test]
    async fn test_non_positive_rate_is_rejected() {
        let fetcher = MockFetcher::new()
            .respond("open.er-api.com", er_api_body("USD", 0.0))
            .fail("frankfurter", 503)
            .fail("currency-api", 503);
        let client = DirectRateClient::new(fetcher);

        let err = client.rate("PHP", "USD").await.unwrap_err();
        match err {
            RateError::AllProvidersFailed { failures, .. } => assert_eq!(failures.len(), 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let fetcher = MockFetcher::new();
        let client = DirectRateClient::new(fetcher);

        assert!(client.rate("PHP", "USD").await.is_err());
        assert!(client.rate("PHP", "USD").await.is_err());
        assert_eq!(client.fetcher.calls(), 2 * DEFAULT_ENDPOINTS.len());
    }

    #[tokio::test]
    async fn test_same_currency_needs_no_fetch() {
        let client = DirectRateClient::new(MockFetcher::new());
        assert_eq!(client.rate("AUD", "aud").await.unwrap(), 1.0);
        assert_eq!(client.fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_clear_forces_refetch() {
        let fetcher = MockFetcher::new().respond("open.er-api.com", er_api_body("USD", 0.0178));
        let client = DirectRateClient::new(fetcher);

        client.rate("PHP", "USD").await.unwrap();
        client.clear();
        client.rate("PHP", "USD").await.unwrap();

        assert_eq!(client.fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_persistent_rates_survive_client_cache() {
        let fetcher = MockFetcher::new().respond("open.er-api.com", er_api_body("USD", 0.0178));
        let cache = TtlCache::new(MemoryCacheStore::new(), chrono::Duration::hours(24));
        let rates = PersistentRates::new(DirectRateClient::new(fetcher), cache);

        rates.rate("PHP", "USD").await.unwrap();
        rates.inner.clear();
        let rate = rates.rate("PHP", "USD").await.unwrap();

        assert_eq!(rate, 0.0178);
        assert_eq!(rates.inner.fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_fallback_used_when_providers_fail() {
        let rates = FallbackRates::new(DirectRateClient::new(MockFetcher::new()), FallbackTable::default());

        let rate = rates.rate("USD", "PHP").await.unwrap();
        assert_eq!(rate, 56.0);
    }

    #[tokio::test]
    async fn test_fallback_keeps_error_for_unknown_currency() {
        let rates = FallbackRates::new(DirectRateClient::new(MockFetcher::new()), FallbackTable::default());

        let err = rates.rate("PHP", "XYZ").await.unwrap_err();
        assert!(matches!(err, RateError::AllProvidersFailed { .. }));
    }

    #[test]
    fn test_fallback_table_cross_rate() {
        let table = FallbackTable::new([("PHP", 1.0), ("USD", 50.0), ("AUD", 25.0)]);
        assert_eq!(table.lookup("USD", "AUD").unwrap(), 2.0);
        assert_eq!(table.lookup("PHP", "USD").unwrap(), 0.02);
        assert!(table.lookup("PHP", "JPY").is_err());
    }
}
