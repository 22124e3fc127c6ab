//! Authorizer facade and its configuration resolvers.
//!
//! The authorization decision engine is an external component; this module
//! owns what the bootstrap hands it — the outbound client, the system cache,
//! the backend caching policy, and the optional metrics reporter — plus the
//! shutdown hook that releases the cache's background resources.

pub mod backend;
pub mod cache;

use crate::metrics::MetricsReporter;

use backend::BackendConfig;
use cache::SystemCache;

/// Authorization manager assembled from the resolved configuration.
#[derive(Debug)]
pub struct Manager {
    client: reqwest::Client,
    cache: SystemCache,
    backend: BackendConfig,
    metrics: Option<MetricsReporter>,
}

impl Manager {
    pub fn new(
        client: reqwest::Client,
        cache: SystemCache,
        backend: BackendConfig,
        metrics: Option<MetricsReporter>,
    ) -> Self {
        Self {
            client,
            cache,
            backend,
            metrics,
        }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn cache(&self) -> &SystemCache {
        &self.cache
    }

    pub fn backend(&self) -> &BackendConfig {
        &self.backend
    }

    /// The metrics reporter, absent when reporting is disabled.
    pub fn metrics(&self) -> Option<&MetricsReporter> {
        self.metrics.as_ref()
    }

    /// Release background resources owned by the authorizer. Currently this
    /// stops the cache's refresh task via its stop channel. Safe to invoke
    /// more than once.
    pub fn shutdown(&self) {
        tracing::debug!("authorizer shutting down");
        self.cache.stop();
    }
}
