//! Exchange rate source abstraction

use super::error::Result;
use super::rates::RateTable;
use async_trait::async_trait;

/// Produces a complete table of fiat prices for one BTC.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch_rates(&self) -> Result<RateTable>;

    /// Short label used in logs.
    fn name(&self) -> &'static str;
}
