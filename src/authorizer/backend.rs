//! Backend caching policy resolution.

use std::time::Duration;

use crate::settings::Settings;

const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(15);

/// Policy applied when the cached backend cannot reach its store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Permit requests to proceed on cache-backend error.
    FailOpen,
    /// Deny requests on cache-backend error.
    FailClosed,
}

/// Backend caching configuration handed to the authorizer.
///
/// When caching is disabled the interval and policy are irrelevant and stay
/// unset; no default substitution happens on that path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub caching_enabled: bool,
    pub flush_interval: Option<Duration>,
    pub failure_policy: Option<FailurePolicy>,
}

impl BackendConfig {
    pub fn resolve(settings: &Settings) -> Self {
        if !settings.get_bool("use_cached_backend") {
            return Self {
                caching_enabled: false,
                flush_interval: None,
                failure_policy: None,
            };
        }

        let mut interval = Duration::from_secs(
            settings
                .get_int("backend_cache_flush_interval_seconds")
                .max(0) as u64,
        );
        if interval == Duration::ZERO {
            interval = DEFAULT_FLUSH_INTERVAL;
        }

        tracing::info!(interval_secs = interval.as_secs(), "backend cache set to flush at fixed intervals");

        Self {
            caching_enabled: true,
            flush_interval: Some(interval),
            failure_policy: Some(resolve_failure_policy(settings)),
        }
    }
}

/// Defaults to FailClosed; only an explicitly-set false flips to FailOpen.
fn resolve_failure_policy(settings: &Settings) -> FailurePolicy {
    if settings.is_set("backend_cache_policy_fail_closed")
        && !settings.get_bool("backend_cache_policy_fail_closed")
    {
        tracing::info!("backend cache fail policy set to open");
        FailurePolicy::FailOpen
    } else {
        tracing::info!("backend cache fail policy set to closed");
        FailurePolicy::FailClosed
    }
}
