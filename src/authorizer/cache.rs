//! System cache configuration and handle.
//!
//! Eviction and refresh internals live in the external cache component; the
//! bootstrap owns only the sizing/TTL/refresh configuration and the stop
//! signal the cache allocates for itself at construction.

use std::time::Duration;

use tokio::sync::broadcast;

use crate::settings::Settings;

const DEFAULT_TTL: Duration = Duration::from_secs(300);
const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(180);
const DEFAULT_MAX_SIZE: usize = 1000;
const DEFAULT_REFRESH_RETRIES: u32 = 1;

/// Sizing and refresh policy for the response cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemCacheConfig {
    pub max_size: usize,
    pub ttl: Duration,
    pub refresh_interval: Duration,
    pub refresh_retries: u32,
}

impl SystemCacheConfig {
    /// Resolve the four cache settings. Each defaults independently when
    /// unset; negative values clamp to zero.
    pub fn resolve(settings: &Settings) -> Self {
        let mut config = Self {
            max_size: DEFAULT_MAX_SIZE,
            ttl: DEFAULT_TTL,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            refresh_retries: DEFAULT_REFRESH_RETRIES,
        };

        if settings.is_set("cache_ttl_seconds") {
            config.ttl = Duration::from_secs(settings.get_int("cache_ttl_seconds").max(0) as u64);
        }

        if settings.is_set("cache_refresh_seconds") {
            config.refresh_interval =
                Duration::from_secs(settings.get_int("cache_refresh_seconds").max(0) as u64);
        }

        if settings.is_set("cache_entries_max") {
            config.max_size = settings.get_int("cache_entries_max").max(0) as usize;
        }

        if settings.is_set("cache_refresh_retries") {
            config.refresh_retries =
                u32::try_from(settings.get_int("cache_refresh_retries").max(0))
                    .unwrap_or(u32::MAX);
        }

        config
    }
}

/// Handle to the response cache instance.
///
/// The stop signal is broadcast-based so that stopping twice, or stopping
/// with no live subscriber, is harmless.
#[derive(Debug)]
pub struct SystemCache {
    config: SystemCacheConfig,
    stop_tx: broadcast::Sender<()>,
}

impl SystemCache {
    /// Construct the cache from a resolved config. The stop channel is
    /// allocated here and owned by the cache; the authorizer's shutdown hook
    /// is the only caller of [`SystemCache::stop`].
    pub fn new(config: SystemCacheConfig) -> Self {
        let (stop_tx, _) = broadcast::channel(1);
        Self { config, stop_tx }
    }

    pub fn config(&self) -> &SystemCacheConfig {
        &self.config
    }

    /// Receiver for the cache's refresh task to observe the stop signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.stop_tx.subscribe()
    }

    /// Signal the refresh task to stop.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYS: [&str; 4] = [
        "cache_ttl_seconds",
        "cache_refresh_seconds",
        "cache_entries_max",
        "cache_refresh_retries",
    ];

    #[test]
    fn all_unset_yields_defaults() {
        let config = SystemCacheConfig::resolve(&Settings::from_pairs::<_, String, String>([]));
        assert_eq!(config.ttl, Duration::from_secs(300));
        assert_eq!(config.refresh_interval, Duration::from_secs(180));
        assert_eq!(config.max_size, 1000);
        assert_eq!(config.refresh_retries, 1);
    }

    #[test]
    fn each_setting_defaults_and_overrides_independently() {
        // All 16 on/off combinations of the four settings.
        for mask in 0u8..16 {
            let mut pairs = Vec::new();
            for (bit, key) in KEYS.iter().enumerate() {
                if mask & (1 << bit) != 0 {
                    pairs.push((*key, "7"));
                }
            }
            let config = SystemCacheConfig::resolve(&Settings::from_pairs(pairs));

            let expect_ttl = if mask & 1 != 0 { 7 } else { 300 };
            let expect_refresh = if mask & 2 != 0 { 7 } else { 180 };
            let expect_max = if mask & 4 != 0 { 7 } else { 1000 };
            let expect_retries = if mask & 8 != 0 { 7 } else { 1 };

            assert_eq!(config.ttl, Duration::from_secs(expect_ttl), "mask {mask:#06b}");
            assert_eq!(
                config.refresh_interval,
                Duration::from_secs(expect_refresh),
                "mask {mask:#06b}"
            );
            assert_eq!(config.max_size, expect_max, "mask {mask:#06b}");
            assert_eq!(config.refresh_retries, expect_retries, "mask {mask:#06b}");
        }
    }

    #[test]
    fn negative_values_clamp_to_zero() {
        let config = SystemCacheConfig::resolve(&Settings::from_pairs([
            ("cache_ttl_seconds", "-5"),
            ("cache_entries_max", "-1"),
        ]));
        assert_eq!(config.ttl, Duration::ZERO);
        assert_eq!(config.max_size, 0);
    }

    #[test]
    fn oversized_refresh_retries_saturates() {
        let config = SystemCacheConfig::resolve(&Settings::from_pairs([(
            "cache_refresh_retries",
            "99999999999",
        )]));
        assert_eq!(config.refresh_retries, u32::MAX);
    }

    #[tokio::test]
    async fn stop_reaches_subscribers() {
        let cache = SystemCache::new(SystemCacheConfig::resolve(
            &Settings::from_pairs::<_, String, String>([]),
        ));
        let mut rx = cache.subscribe();
        cache.stop();
        assert!(rx.recv().await.is_ok());
    }
}
