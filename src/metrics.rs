//! Sideband metrics endpoint and reporter callbacks.
//!
//! # Responsibilities
//! - Decide whether metrics reporting is enabled at all
//! - Serve the Prometheus exposition endpoint on its own listener
//! - Hand the authorizer the callbacks it invokes on responses and cache hits
//!
//! # Design Decisions
//! - When reporting is disabled the reporter does not exist; no listener is
//!   bound and no dead callbacks get wired
//! - The exposition path is a constant, only the port is configurable
//! - The sideband listener runs for the process lifetime; it has no part in
//!   graceful shutdown

use std::future::ready;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::error::FatalError;
use crate::settings::Settings;

const METRICS_ENDPOINT: &str = "/metrics";
const DEFAULT_METRICS_PORT: i64 = 8080;

/// Callback handles handed to the authorizer when reporting is enabled.
#[derive(Debug, Clone)]
pub struct MetricsReporter;

impl MetricsReporter {
    /// Start the sideband server and return the reporter, or `None` when
    /// `report_metrics` is unset or false. A failed listener bind is fatal.
    pub async fn resolve(settings: &Settings) -> Result<Option<Self>, FatalError> {
        if !settings.is_set("report_metrics") || !settings.get_bool("report_metrics") {
            return Ok(None);
        }

        let port = resolve_port(settings);

        // Bind before touching the global recorder so a failed bind leaves
        // the process recorder-free.
        let listener = TcpListener::bind(format!("0.0.0.0:{port}"))
            .await
            .map_err(|source| FatalError::MetricsBind { port, source })?;

        let reporter = Self::serve(listener)?;
        tracing::info!(port, "serving metrics");

        Ok(Some(reporter))
    }

    /// Install the recorder and serve the exposition endpoint on `listener`.
    fn serve(listener: TcpListener) -> Result<Self, FatalError> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(FatalError::MetricsRecorder)?;
        register_metric_descriptions();

        let app = Router::new()
            .route(METRICS_ENDPOINT, get(move || ready(handle.render())))
            .layer(TraceLayer::new_for_http());

        tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                tracing::error!(error = %err, "metrics server stopped unexpectedly");
            }
        });

        Ok(Self)
    }

    /// Record an authorization response and its latency.
    pub fn on_response(&self, service_id: &str, status: u16, duration: Duration) {
        counter!(
            "authz_responses_total",
            "service" => service_id.to_string(),
            "status" => status.to_string()
        )
        .increment(1);
        histogram!(
            "authz_response_duration_seconds",
            "service" => service_id.to_string()
        )
        .record(duration.as_secs_f64());
    }

    /// Record a cache hit observed by the authorizer.
    pub fn on_cache_hit(&self) {
        counter!("authz_cache_hits_total").increment(1);
    }
}

fn register_metric_descriptions() {
    describe_counter!(
        "authz_responses_total",
        "Total authorization responses by service and status"
    );
    describe_histogram!(
        "authz_response_duration_seconds",
        "Authorization response latency in seconds"
    );
    describe_counter!("authz_cache_hits_total", "Total response cache hits");
}

fn resolve_port(settings: &Settings) -> i64 {
    if settings.is_set("metrics_port") {
        settings.get_int("metrics_port")
    } else {
        DEFAULT_METRICS_PORT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn absent_report_metrics_disables_reporting() {
        let settings = Settings::from_pairs::<_, String, String>([]);
        let reporter = MetricsReporter::resolve(&settings).await.unwrap();
        assert!(reporter.is_none());
    }

    #[tokio::test]
    async fn explicit_false_disables_reporting() {
        let settings = Settings::from_pairs([("report_metrics", "false")]);
        let reporter = MetricsReporter::resolve(&settings).await.unwrap();
        assert!(reporter.is_none());
    }

    #[tokio::test]
    async fn disabled_reporting_ignores_metrics_port() {
        let settings = Settings::from_pairs([("metrics_port", "9999")]);
        let reporter = MetricsReporter::resolve(&settings).await.unwrap();
        assert!(reporter.is_none());
    }

    #[tokio::test]
    async fn bind_failure_on_taken_port_is_fatal() {
        let taken = TcpListener::bind("0.0.0.0:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let settings = Settings::from_pairs([
            ("report_metrics", "true".to_string()),
            ("metrics_port", port.to_string()),
        ]);
        let err = MetricsReporter::resolve(&settings).await.unwrap_err();
        assert!(matches!(err, FatalError::MetricsBind { .. }));
    }

    // The recorder is process-global, so exactly one test installs it. The
    // bind-failure test above errors out before the install.
    #[tokio::test]
    async fn enabled_reporting_serves_the_exposition_endpoint() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let reporter = MetricsReporter::serve(listener).unwrap();

        reporter.on_cache_hit();
        reporter.on_response("svc-a", 200, Duration::from_millis(5));

        let body = reqwest::get(format!("http://{addr}{METRICS_ENDPOINT}"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(body.contains("authz_cache_hits_total"));
        assert!(body.contains("authz_responses_total"));
    }

    #[test]
    fn port_defaults_and_overrides() {
        let settings = Settings::from_pairs::<_, String, String>([]);
        assert_eq!(resolve_port(&settings), 8080);

        let settings = Settings::from_pairs([("metrics_port", "9100")]);
        assert_eq!(resolve_port(&settings), 9100);
    }
}
