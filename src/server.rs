//! Adapter server facade.
//!
//! The wire protocol served to the mesh lives in the external adapter
//! component; this module owns the lifecycle surface the controller needs:
//! bind at startup (fatal on failure), a serve loop running on a background
//! task that reports its exit exactly once on a channel, and a graceful
//! close handle.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;

use crate::authorizer::Manager;
use crate::error::FatalError;

/// Version string embedded at build time; `undefined` when never set.
pub const BUILD_VERSION: &str = match option_env!("ADAPTER_BUILD_VERSION") {
    Some(version) => version,
    None => "undefined",
};

/// Constructor arguments for the adapter server.
#[derive(Debug)]
pub struct AdapterConfig {
    pub authorizer: Arc<Manager>,
    /// Maximum age of a client connection before the server cycles it.
    /// Enforcement belongs to the wire-protocol internals.
    pub keep_alive_max_age: Duration,
}

/// Error reported on the exit channel when the serve loop ends abnormally.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ServeError(pub std::io::Error);

/// Error returned by [`ServerHandle::close`].
#[derive(Debug, Error)]
pub enum CloseError {
    #[error("server is no longer running")]
    Stopped,
}

/// A bound adapter server, not yet serving.
#[derive(Debug)]
pub struct AdapterServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    config: AdapterConfig,
}

impl AdapterServer {
    /// Bind the adapter listener. A bare port such as `"3333"` binds all
    /// interfaces on that port.
    pub async fn bind(addr: &str, config: AdapterConfig) -> Result<Self, FatalError> {
        let addr = normalize_listen_addr(addr);
        let listener =
            TcpListener::bind(&addr)
                .await
                .map_err(|source| FatalError::ServerBind {
                    addr: addr.clone(),
                    source,
                })?;
        let local_addr = listener.local_addr().map_err(|source| FatalError::ServerBind {
            addr: addr.clone(),
            source,
        })?;

        tracing::info!(
            addr = %local_addr,
            keep_alive_max_age_secs = config.keep_alive_max_age.as_secs(),
            "adapter server bound"
        );

        Ok(Self {
            listener,
            local_addr,
            config,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Launch the serve loop on a background task. Exactly one value is sent
    /// on `exit_tx` when the loop ends: `None` for a clean stop, the error
    /// otherwise. The returned handle is the only way to stop the loop.
    pub fn run(self, exit_tx: mpsc::Sender<Option<ServeError>>) -> ServerHandle {
        let (close_tx, mut close_rx) = mpsc::channel::<()>(1);

        let app = Router::new()
            .route("/healthz", get(healthz))
            .layer(TraceLayer::new_for_http());

        let authorizer = self.config.authorizer;
        let listener = self.listener;
        let local_addr = self.local_addr;

        tokio::spawn(async move {
            tracing::info!(version = BUILD_VERSION, "starting adapter server");
            // The wire-protocol handlers hold the authorizer for the
            // lifetime of the serve loop.
            let _authorizer = authorizer;
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = close_rx.recv().await;
                })
                .await;
            let _ = exit_tx.send(result.err().map(ServeError)).await;
        });

        ServerHandle {
            close_tx,
            local_addr,
        }
    }
}

/// Handle to a running serve loop.
pub struct ServerHandle {
    close_tx: mpsc::Sender<()>,
    local_addr: SocketAddr,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Request a graceful stop. Errors once the loop has already exited;
    /// a second request while a stop is pending is accepted silently.
    pub fn close(&self) -> Result<(), CloseError> {
        match self.close_tx.try_send(()) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(())) => Ok(()),
            Err(mpsc::error::TrySendError::Closed(())) => Err(CloseError::Stopped),
        }
    }
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

fn normalize_listen_addr(addr: &str) -> String {
    if addr.contains(':') {
        addr.to_string()
    } else {
        format!("0.0.0.0:{addr}")
    }
}
