//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber from the bound settings
//! - Map the adapter log level names onto filter directives
//! - Optionally silence the HTTP/2 machinery's own logging
//!
//! # Design Decisions
//! - JSON output when `log_json` is set, human-readable otherwise
//! - `log_grpc` defaults to true; only an explicit false appends the
//!   silencing directives for the transport crates

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::settings::Settings;

/// Initialize the global tracing subscriber. Call once, before any resolver
/// runs.
pub fn configure_logging(settings: &Settings) {
    let filter = EnvFilter::new(filter_directives(settings));
    let registry = tracing_subscriber::registry().with(filter);

    if settings.get_bool("log_json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Build the filter directive string from the settings.
fn filter_directives(settings: &Settings) -> String {
    let mut directives = level_directive(&settings.get_string("log_level")).to_string();
    if settings.is_set("log_grpc") && !settings.get_bool("log_grpc") {
        directives.push_str(",h2=off,hyper=off,tower=off");
    }
    directives
}

/// Map an adapter log level name to a filter directive. Unknown or absent
/// values fall back to info.
fn level_directive(level: &str) -> &'static str {
    match level.to_ascii_lowercase().as_str() {
        "debug" => "debug",
        "info" => "info",
        "warn" => "warn",
        "error" => "error",
        "none" => "off",
        _ => "info",
    }
}
