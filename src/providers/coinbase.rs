use crate::core::RateSource;
use crate::core::error::{ConverterError, Result};
use crate::core::rates::RateTable;
use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, HeaderMap, HeaderValue, PRAGMA};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, instrument};

pub const DEFAULT_BASE_URL: &str = "https://api.coinbase.com";

/// Host of the rate endpoint; requests to it are never served from cache.
pub const RATE_HOST: &str = "coinbase.com";

const RATES_PATH: &str = "/v2/exchange-rates";

/// Live BTC exchange rates from the Coinbase public API.
pub struct CoinbaseRateSource {
    base_url: String,
    client: reqwest::Client,
}

impl CoinbaseRateSource {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache, no-store"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));

        let client = reqwest::Client::builder()
            .user_agent("satsconv/0.1")
            .default_headers(headers)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn url(&self) -> String {
        format!("{}{}?currency=BTC", self.base_url, RATES_PATH)
    }
}

#[derive(Debug, Deserialize)]
struct ExchangeRatesResponse {
    data: Option<ExchangeRatesData>,
}

#[derive(Debug, Deserialize)]
struct ExchangeRatesData {
    rates: Option<HashMap<String, Value>>,
}

#[async_trait]
impl RateSource for CoinbaseRateSource {
    #[instrument(name = "CoinbaseRateFetch", skip(self))]
    async fn fetch_rates(&self) -> Result<RateTable> {
        let url = self.url();
        debug!("Requesting exchange rates from {}", url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(ConverterError::TransportFailure(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let text = response.text().await?;
        let data: ExchangeRatesResponse = serde_json::from_str(&text)
            .map_err(|e| ConverterError::MalformedResponse(format!("invalid JSON: {e}")))?;

        let rates = data
            .data
            .and_then(|d| d.rates)
            .ok_or_else(|| ConverterError::MalformedResponse("missing data.rates".into()))?;

        Ok(RateTable::from_raw(&rates))
    }

    fn name(&self) -> &'static str {
        "coinbase"
    }
}
