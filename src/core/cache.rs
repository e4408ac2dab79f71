//! Versioned offline cache for the installable app shell.
//!
//! Static assets are pre-cached under a version name at install time.
//! Activating a version deletes every other version. Rate requests always go
//! to the network; other GET requests are served cache-first.
//!
//! This is the policy of the installable web shell, kept host-side so hosts
//! that serve the shell can apply it. The CLI itself does not cache.

use futures::future::try_join_all;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

pub const CACHE_VERSION: &str = "btcconv-v3";

pub const PRECACHE_ASSETS: [&str; 7] = [
    "./",
    "index.html",
    "app.js",
    "manifest.json",
    "icons/icon-180.png",
    "icons/icon-192.png",
    "icons/icon-512.png",
];

/// How a request is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchRoute {
    /// Not handled by the cache at all.
    Passthrough,
    /// Always fetched fresh.
    Network,
    /// Served from cache, falling back to the network on a miss.
    CacheFirst,
}

pub fn route(method: &str, url: &str, rate_host: &str) -> FetchRoute {
    if !method.eq_ignore_ascii_case("GET") {
        FetchRoute::Passthrough
    } else if url.contains(rate_host) {
        FetchRoute::Network
    } else {
        FetchRoute::CacheFirst
    }
}

type Entries = HashMap<String, Arc<Vec<u8>>>;

#[derive(Clone, Default)]
pub struct AssetCache {
    versions: Arc<Mutex<HashMap<String, Entries>>>,
}

impl AssetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-caches `assets` under `version`.
    pub async fn install(&self, version: &str, assets: impl IntoIterator<Item = (String, Vec<u8>)>) {
        let mut versions = self.versions.lock().await;
        let entries = versions.entry(version.to_string()).or_default();
        for (url, body) in assets {
            debug!(version, url = %url, "Cache PUT");
            entries.insert(url, Arc::new(body));
        }
    }

    /// Fetches every asset concurrently and installs them only if all
    /// succeed, so a failed install leaves no partial version behind.
    pub async fn precache<F, Fut, E>(&self, version: &str, assets: &[&str], fetch: F) -> Result<(), E>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<Vec<u8>, E>>,
    {
        let bodies = try_join_all(assets.iter().map(|url| {
            let url = url.to_string();
            let body = fetch(url.clone());
            async move { body.await.map(|b| (url, b)) }
        }))
        .await?;
        self.install(version, bodies).await;
        Ok(())
    }

    /// Deletes every version except `current`. Returns the deleted names.
    pub async fn activate(&self, current: &str) -> Vec<String> {
        let mut versions = self.versions.lock().await;
        let mut stale: Vec<String> = versions
            .keys()
            .filter(|k| k.as_str() != current)
            .cloned()
            .collect();
        stale.sort();
        for name in &stale {
            versions.remove(name);
            debug!(version = %name, "Cache DELETE");
        }
        stale
    }

    pub async fn versions(&self) -> Vec<String> {
        let mut names: Vec<String> = self.versions.lock().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Looks `url` up in any cached version.
    pub async fn get(&self, url: &str) -> Option<Arc<Vec<u8>>> {
        let versions = self.versions.lock().await;
        let hit = versions.values().find_map(|e| e.get(url)).cloned();
        debug!(url, hit = hit.is_some(), "Cache lookup");
        hit
    }

    /// Serves a request according to [`route`], calling `network` when the
    /// cache cannot answer. Returns `None` for passthrough requests.
    pub async fn respond<F, Fut, E>(
        &self,
        method: &str,
        url: &str,
        rate_host: &str,
        network: F,
    ) -> Option<Result<Arc<Vec<u8>>, E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<u8>, E>>,
    {
        match route(method, url, rate_host) {
            FetchRoute::Passthrough => None,
            FetchRoute::Network => Some(network().await.map(Arc::new)),
            FetchRoute::CacheFirst => match self.get(url).await {
                Some(body) => Some(Ok(body)),
                None => Some(network().await.map(Arc::new)),
            },
        }
    }
}
