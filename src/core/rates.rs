//! Rate table and the shared store holding the latest fetched table.

use super::error::ConverterError;
use chrono::{DateTime, Local};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Currencies listed first in the selector, in this order.
pub const PREFERRED_CURRENCIES: [&str; 25] = [
    "USD", "EUR", "AED", "GBP", "JPY", "AUD", "CAD", "CHF", "CNY", "HKD", "INR", "BRL", "MXN",
    "NZD", "SGD", "ZAR", "SEK", "NOK", "DKK", "PLN", "TRY", "SAR", "TWD", "KRW", "ILS",
];

pub const DEFAULT_CURRENCY: &str = "USD";

/// Returns true for three ASCII uppercase letters, e.g. `EUR`.
pub fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase())
}

fn parse_rate(raw: &Value) -> Option<f64> {
    let n = match raw {
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Number(n) => n.as_f64()?,
        _ => return None,
    };
    (n.is_finite() && n > 0.0).then_some(n)
}

/// Price of one BTC per fiat code. Only positive finite values are kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTable {
    rates: HashMap<String, f64>,
}

impl RateTable {
    /// Normalizes a raw `code -> value` map as returned by the endpoint.
    ///
    /// Values may be numbers or stringified numbers. Entries with a key that
    /// is not a currency code, or a value that is not a positive finite
    /// number, are dropped.
    pub fn from_raw(raw: &HashMap<String, Value>) -> Self {
        let rates: HashMap<String, f64> = raw
            .iter()
            .filter(|(code, _)| is_currency_code(code))
            .filter_map(|(code, value)| parse_rate(value).map(|n| (code.clone(), n)))
            .collect();
        debug!(
            kept = rates.len(),
            dropped = raw.len() - rates.len(),
            "Normalized rate table"
        );
        Self { rates }
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        let rates = pairs
            .into_iter()
            .filter(|(code, n)| is_currency_code(code) && n.is_finite() && *n > 0.0)
            .map(|(code, n)| (code.to_string(), n))
            .collect();
        Self { rates }
    }

    pub fn get(&self, code: &str) -> Option<f64> {
        self.rates.get(code).copied()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.rates.keys().map(String::as_str)
    }

    /// Codes in selector order: the preferred prefix (only those present),
    /// then everything else alphabetically.
    pub fn ordered_codes(&self) -> Vec<String> {
        let mut rest: Vec<&str> = self
            .codes()
            .filter(|c| !PREFERRED_CURRENCIES.contains(c))
            .collect();
        rest.sort_unstable();

        PREFERRED_CURRENCIES
            .iter()
            .copied()
            .filter(|c| self.rates.contains_key(*c))
            .chain(rest)
            .map(str::to_string)
            .collect()
    }
}

/// A fully applied fetch result.
#[derive(Debug, Clone)]
pub struct RateSnapshot {
    pub table: Arc<RateTable>,
    pub fetched_at: DateTime<Local>,
    pub test_mode: bool,
}

#[derive(Default)]
struct StoreState {
    snapshot: Option<RateSnapshot>,
    last_error: Option<ConverterError>,
    currency_options: Option<Vec<String>>,
    issued: u64,
    applied: u64,
}

/// Holds the latest rate table. Tables are swapped whole, never merged.
///
/// Every refresh takes a ticket from [`RateStore::begin_refresh`]; a result
/// carrying an older ticket than the last applied one is discarded, so a
/// slow response cannot overwrite a newer table.
#[derive(Default)]
pub struct RateStore {
    inner: RwLock<StoreState>,
}

impl RateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a refresh and hides any previous error.
    pub async fn begin_refresh(&self) -> u64 {
        let mut state = self.inner.write().await;
        state.issued += 1;
        state.last_error = None;
        state.issued
    }

    /// Replaces the table if `ticket` is newer than the last applied one.
    pub async fn replace(&self, ticket: u64, table: Arc<RateTable>, test_mode: bool) -> bool {
        let mut state = self.inner.write().await;
        if ticket <= state.applied {
            debug!(ticket, applied = state.applied, "Dropping stale rate table");
            return false;
        }
        state.applied = ticket;
        state.last_error = None;
        if state.currency_options.is_none() {
            state.currency_options = Some(table.ordered_codes());
        }
        state.snapshot = Some(RateSnapshot {
            table,
            fetched_at: Local::now(),
            test_mode,
        });
        true
    }

    /// Records a failed refresh. The current table is left untouched.
    pub async fn record_failure(&self, ticket: u64, error: ConverterError) {
        let mut state = self.inner.write().await;
        if ticket <= state.applied {
            debug!(ticket, "Ignoring failure of a superseded refresh");
            return;
        }
        state.last_error = Some(error);
    }

    pub async fn snapshot(&self) -> Option<RateSnapshot> {
        self.inner.read().await.snapshot.clone()
    }

    pub async fn table(&self) -> Option<Arc<RateTable>> {
        self.inner
            .read()
            .await
            .snapshot
            .as_ref()
            .map(|s| Arc::clone(&s.table))
    }

    pub async fn last_error(&self) -> Option<ConverterError> {
        self.inner.read().await.last_error.clone()
    }

    /// Selector entries, fixed by the first table ever applied.
    pub async fn currency_options(&self) -> Vec<String> {
        self.inner
            .read()
            .await
            .currency_options
            .clone()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_from_raw_drops_invalid_entries() {
        let table = RateTable::from_raw(&raw(&[
            ("USD", json!("68000.12")),
            ("EUR", json!(62000.5)),
            ("GBP", json!("0")),
            ("JPY", json!("-3")),
            ("CHF", json!("NaN")),
            ("CAD", json!("inf")),
            ("AUD", json!("abc")),
            ("USDC", json!("68000")),
            ("usd", json!("1")),
            ("INR", json!(null)),
        ]));

        assert_eq!(table.len(), 2);
        assert_eq!(table.get("USD"), Some(68000.12));
        assert_eq!(table.get("EUR"), Some(62000.5));
        assert!(table.get("GBP").is_none());
        assert!(table.get("USDC").is_none());
    }

    #[test]
    fn test_ordered_codes_preferred_prefix_then_alphabetical() {
        let table = RateTable::from_pairs([
            ("ZMW", 1.0),
            ("EUR", 1.0),
            ("ARS", 1.0),
            ("USD", 1.0),
            ("ILS", 1.0),
            ("BTN", 1.0),
        ]);
        assert_eq!(
            table.ordered_codes(),
            vec!["USD", "EUR", "ILS", "ARS", "BTN", "ZMW"]
        );
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_table() {
        let store = RateStore::new();
        let ticket = store.begin_refresh().await;
        let table = RateTable::from_pairs([("USD", 68000.0), ("EUR", 62000.0)]);
        assert!(store.replace(ticket, Arc::new(table.clone()), false).await);

        let ticket = store.begin_refresh().await;
        store
            .record_failure(ticket, ConverterError::TransportFailure("HTTP 502".into()))
            .await;

        assert_eq!(*store.table().await.unwrap(), table);
        assert_eq!(
            store.last_error().await,
            Some(ConverterError::TransportFailure("HTTP 502".into()))
        );
    }

    #[tokio::test]
    async fn test_stale_response_is_dropped() {
        let store = RateStore::new();
        let slow = store.begin_refresh().await;
        let fast = store.begin_refresh().await;

        assert!(
            store
                .replace(fast, Arc::new(RateTable::from_pairs([("USD", 2.0)])), false)
                .await
        );
        assert!(
            !store
                .replace(slow, Arc::new(RateTable::from_pairs([("USD", 1.0)])), false)
                .await
        );
        assert_eq!(store.table().await.unwrap().get("USD"), Some(2.0));
    }

    #[tokio::test]
    async fn test_currency_options_come_from_first_applied_table() {
        let store = RateStore::new();
        assert!(store.currency_options().await.is_empty());

        let ticket = store.begin_refresh().await;
        store
            .record_failure(ticket, ConverterError::TransportFailure("HTTP 502".into()))
            .await;
        assert!(store.currency_options().await.is_empty());

        let ticket = store.begin_refresh().await;
        let first = RateTable::from_pairs([("EUR", 1.0), ("USD", 1.0)]);
        store.replace(ticket, Arc::new(first), false).await;

        let ticket = store.begin_refresh().await;
        let second = RateTable::from_pairs([("GBP", 1.0)]);
        store.replace(ticket, Arc::new(second), true).await;

        assert_eq!(store.currency_options().await, vec!["USD", "EUR"]);
        assert_eq!(store.table().await.unwrap().get("GBP"), Some(1.0));
    }

    #[tokio::test]
    async fn test_begin_refresh_clears_error() {
        let store = RateStore::new();
        let ticket = store.begin_refresh().await;
        store
            .record_failure(ticket, ConverterError::MalformedResponse("x".into()))
            .await;
        assert!(store.last_error().await.is_some());

        store.begin_refresh().await;
        assert!(store.last_error().await.is_none());
    }
}
