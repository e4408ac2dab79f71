//! Refreshes the rate store from the live source or the test-mode table.

use super::currency::RateSource;
use super::error::Result;
use super::rates::{RateStore, RateTable};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, instrument, warn};

pub struct RateFetcher {
    live: Arc<dyn RateSource>,
    test: Arc<dyn RateSource>,
    test_mode: AtomicBool,
    store: Arc<RateStore>,
}

impl RateFetcher {
    pub fn new(live: Arc<dyn RateSource>, test: Arc<dyn RateSource>, store: Arc<RateStore>) -> Self {
        Self {
            live,
            test,
            test_mode: AtomicBool::new(false),
            store,
        }
    }

    pub fn store(&self) -> &Arc<RateStore> {
        &self.store
    }

    pub fn set_test_mode(&self, enabled: bool) {
        self.test_mode.store(enabled, Ordering::SeqCst);
    }

    pub fn test_mode(&self) -> bool {
        self.test_mode.load(Ordering::SeqCst)
    }

    /// Fetches a fresh table and swaps it into the store.
    ///
    /// On failure the previous table stays and the error is kept for
    /// display. No retry is attempted.
    #[instrument(name = "RateRefresh", skip(self), fields(test_mode = self.test_mode()))]
    pub async fn refresh(&self) -> Result<Arc<RateTable>> {
        let test_mode = self.test_mode();
        let source = if test_mode { &self.test } else { &self.live };
        let ticket = self.store.begin_refresh().await;

        match source.fetch_rates().await {
            Ok(table) => {
                info!(
                    source = source.name(),
                    currencies = table.len(),
                    "Fetched rate table"
                );
                let table = Arc::new(table);
                self.store
                    .replace(ticket, Arc::clone(&table), test_mode)
                    .await;
                Ok(table)
            }
            Err(e) => {
                warn!(source = source.name(), error = %e, "Rate refresh failed");
                self.store.record_failure(ticket, e.clone()).await;
                Err(e)
            }
        }
    }
}
