//! Fatal error taxonomy.
//!
//! Every unrecoverable condition is a `FatalError` variant returned up to
//! `main`, which logs it once and exits non-zero. Resolvers never log-and-exit
//! themselves.

use std::path::PathBuf;

use thiserror::Error;

use crate::server::{CloseError, ServeError};

/// Conditions that terminate the process with a non-zero status.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("failed to read root CA file {path:?}: {source}")]
    RootCaRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse root CA certificates from {path:?}: {source}")]
    RootCaParse {
        path: PathBuf,
        #[source]
        source: reqwest::Error,
    },

    #[error("empty client_key path")]
    EmptyClientKey,

    #[error("both client_cert and client_key must be provided if you set any of them")]
    IncompleteClientPair,

    #[error("failed to read client certificate material {path:?}: {source}")]
    IdentityRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error creating identity from {cert:?} and {key:?}: {source}")]
    IdentityParse {
        cert: PathBuf,
        key: PathBuf,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to construct HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("failed to install metrics recorder: {0}")]
    MetricsRecorder(#[source] metrics_exporter_prometheus::BuildError),

    #[error("failed to start metrics server on port {port}: {source}")]
    MetricsBind {
        port: i64,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to start server on {addr}: {source}")]
    ServerBind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("error calling graceful shutdown: {source}")]
    GracefulClose {
        #[source]
        source: CloseError,
    },

    #[error("adapter server has shut down: {0}")]
    ServerExit(#[source] ServeError),

    #[error("shutdown event sources closed unexpectedly")]
    EventSourcesClosed,
}
