//! Environment-bound process settings.
//!
//! # Responsibilities
//! - Bind the documented settings from environment variables, once, at startup
//! - Distinguish "absent" from "present but empty/zero" via `is_set`
//! - Serve typed lookups with zero-value fallbacks for absent keys
//!
//! # Design Decisions
//! - Settings are immutable after binding; resolvers receive a shared reference
//! - Typed getters never fail: unparseable values collapse to the zero value,
//!   callers that care about presence must check `is_set` first
//! - `from_pairs` lets tests exercise resolvers without touching the process
//!   environment

use std::collections::HashMap;

/// Every setting the adapter reads, bound from the uppercase environment
/// variable of the same name.
const BOUND_KEYS: &[&str] = &[
    "log_level",
    "log_json",
    "log_grpc",
    "listen_addr",
    "report_metrics",
    "metrics_port",
    "cache_ttl_seconds",
    "cache_refresh_seconds",
    "cache_entries_max",
    "cache_refresh_retries",
    "client_timeout_seconds",
    "allow_insecure_conn",
    "root_ca",
    "client_cert",
    "client_key",
    "grpc_conn_max_seconds",
    "use_cached_backend",
    "backend_cache_flush_interval_seconds",
    "backend_cache_policy_fail_closed",
];

/// Immutable key/value store of the settings present at startup.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    values: HashMap<String, String>,
}

impl Settings {
    /// Bind all documented keys from the environment. Keys whose variable is
    /// unset are absent; a variable set to the empty string is present.
    pub fn from_env() -> Self {
        let values = BOUND_KEYS
            .iter()
            .filter_map(|key| {
                std::env::var(key.to_ascii_uppercase())
                    .ok()
                    .map(|raw| ((*key).to_string(), raw))
            })
            .collect();
        Self { values }
    }

    /// Build settings from explicit pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Whether the key was present at bind time, regardless of its value.
    pub fn is_set(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// The raw string value, or an empty string if absent.
    pub fn get_string(&self, key: &str) -> String {
        self.values.get(key).cloned().unwrap_or_default()
    }

    /// The value parsed as an integer; 0 if absent or unparseable.
    pub fn get_int(&self, key: &str) -> i64 {
        self.values
            .get(key)
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(0)
    }

    /// The value parsed as a boolean; false if absent or unrecognized.
    /// Accepts `1`, `t`, `true` (case-insensitive) as truthy.
    pub fn get_bool(&self, key: &str) -> bool {
        self.values
            .get(key)
            .map(|raw| {
                matches!(
                    raw.trim().to_ascii_lowercase().as_str(),
                    "1" | "t" | "true"
                )
            })
            .unwrap_or(false)
    }
}
