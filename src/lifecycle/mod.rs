//! Process lifecycle supervision.
//!
//! # Data Flow
//! ```text
//! Starting:
//!     Resolve listen address + keep-alive → construct authorizer + server
//!     → launch serve loop on background task
//!
//! Running (supervise loop):
//!     OS signal ───────────────┐
//!                              ├─▶ select ─▶ one ShutdownEvent per iteration
//!     serve-loop exit report ──┘
//!
//! Signal branch:   authorizer shutdown hook → graceful close
//!                  (close failure is fatal; success loops back)
//! Exit branch:     error is fatal; None is the clean return
//! ```
//!
//! # Design Decisions
//! - Both shutdown sources feed one consumer; only one branch runs per
//!   iteration, so no lock coordinates the shutdown sequence
//! - Repeated signals are not deduplicated: a second signal re-enters the
//!   signal branch and attempts shutdown again
//! - The graceful close call carries no timeout; a hang in close blocks the
//!   exit. Callers wanting bounded shutdown must wrap supervision externally.

pub mod signals;

use std::time::Duration;

use tokio::sync::mpsc;

use crate::authorizer::Manager;
use crate::error::FatalError;
use crate::server::{CloseError, ServeError, ServerHandle};
use crate::settings::Settings;

const DEFAULT_LISTEN_ADDR: &str = "3333";
const DEFAULT_KEEP_ALIVE_MAX_AGE: Duration = Duration::from_secs(60);

/// Resolve the adapter listen address.
pub fn resolve_listen_addr(settings: &Settings) -> String {
    if settings.is_set("listen_addr") {
        settings.get_string("listen_addr")
    } else {
        DEFAULT_LISTEN_ADDR.to_string()
    }
}

/// Resolve the maximum connection age passed to the adapter server.
pub fn resolve_keep_alive_max_age(settings: &Settings) -> Duration {
    if settings.is_set("grpc_conn_max_seconds") {
        Duration::from_secs(settings.get_int("grpc_conn_max_seconds").max(0) as u64)
    } else {
        DEFAULT_KEEP_ALIVE_MAX_AGE
    }
}

/// One event observed by the supervise loop.
#[derive(Debug)]
pub enum ShutdownEvent {
    /// An OS termination or interrupt signal arrived.
    Signal(&'static str),
    /// The serve loop exited; `None` means a clean stop.
    ServerExit(Option<ServeError>),
}

/// Graceful-stop surface of a running server, kept narrow so shutdown paths
/// are testable without a bound socket.
pub trait ServerControl {
    fn close(&self) -> Result<(), CloseError>;
}

impl ServerControl for ServerHandle {
    fn close(&self) -> Result<(), CloseError> {
        ServerHandle::close(self)
    }
}

/// Supervise the running server until a terminal event.
///
/// A signal triggers the authorizer's shutdown hook followed by a graceful
/// close request; a failed close is fatal, a successful one loops back to
/// await the serve loop's exit report. An abnormal exit report is fatal; a
/// clean one returns normally without invoking the shutdown hook or close.
pub async fn supervise<S: ServerControl>(
    authorizer: &Manager,
    server: &S,
    mut signals: mpsc::Receiver<&'static str>,
    mut server_exit: mpsc::Receiver<Option<ServeError>>,
) -> Result<(), FatalError> {
    loop {
        let event = tokio::select! {
            Some(signal) = signals.recv() => ShutdownEvent::Signal(signal),
            Some(exit) = server_exit.recv() => ShutdownEvent::ServerExit(exit),
            else => return Err(FatalError::EventSourcesClosed),
        };

        match event {
            ShutdownEvent::Signal(signal) => {
                tracing::info!(signal, "signal received, attempting graceful shutdown");
                authorizer.shutdown();
                server
                    .close()
                    .map_err(|source| FatalError::GracefulClose { source })?;
            }
            ShutdownEvent::ServerExit(Some(err)) => return Err(FatalError::ServerExit(err)),
            ShutdownEvent::ServerExit(None) => {
                tracing::info!("adapter server has shut down gracefully");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::authorizer::backend::BackendConfig;
    use crate::authorizer::cache::{SystemCache, SystemCacheConfig};

    struct StubServer {
        fail_close: bool,
        closes: AtomicUsize,
    }

    impl StubServer {
        fn new(fail_close: bool) -> Self {
            Self {
                fail_close,
                closes: AtomicUsize::new(0),
            }
        }

        fn close_count(&self) -> usize {
            self.closes.load(Ordering::SeqCst)
        }
    }

    impl ServerControl for StubServer {
        fn close(&self) -> Result<(), CloseError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            if self.fail_close {
                Err(CloseError::Stopped)
            } else {
                Ok(())
            }
        }
    }

    fn test_manager() -> Manager {
        let settings = Settings::from_pairs::<_, String, String>([]);
        Manager::new(
            reqwest::Client::new(),
            SystemCache::new(SystemCacheConfig::resolve(&settings)),
            BackendConfig::resolve(&settings),
            None,
        )
    }

    fn io_error(message: &str) -> ServeError {
        ServeError(std::io::Error::other(message.to_string()))
    }

    #[tokio::test]
    async fn clean_server_exit_returns_without_shutdown_hook_or_close() {
        let manager = test_manager();
        let server = StubServer::new(false);
        let (_sig_tx, sig_rx) = mpsc::channel(1);
        let (exit_tx, exit_rx) = mpsc::channel(1);

        let mut stopped = manager.cache().subscribe();
        exit_tx.send(None).await.unwrap();

        supervise(&manager, &server, sig_rx, exit_rx).await.unwrap();

        assert_eq!(server.close_count(), 0);
        assert!(matches!(
            stopped.try_recv(),
            Err(tokio::sync::broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn abnormal_server_exit_is_fatal() {
        let manager = test_manager();
        let server = StubServer::new(false);
        let (_sig_tx, sig_rx) = mpsc::channel(1);
        let (exit_tx, exit_rx) = mpsc::channel(1);

        exit_tx.send(Some(io_error("accept failed"))).await.unwrap();

        let err = supervise(&manager, &server, sig_rx, exit_rx)
            .await
            .unwrap_err();
        assert!(matches!(err, FatalError::ServerExit(_)));
        assert_eq!(server.close_count(), 0);
    }

    #[tokio::test]
    async fn signal_runs_shutdown_hook_then_close_then_awaits_exit() {
        let manager = test_manager();
        let server = StubServer::new(false);
        let (sig_tx, sig_rx) = mpsc::channel(1);
        let (exit_tx, exit_rx) = mpsc::channel(1);

        let mut stopped = manager.cache().subscribe();

        sig_tx.send("SIGTERM").await.unwrap();
        // The serve loop reports its clean exit after the close request.
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            exit_tx.send(None).await.unwrap();
        });

        supervise(&manager, &server, sig_rx, exit_rx).await.unwrap();

        assert_eq!(server.close_count(), 1);
        assert!(stopped.try_recv().is_ok());
    }

    #[tokio::test]
    async fn failed_close_is_fatal() {
        let manager = test_manager();
        let server = StubServer::new(true);
        let (sig_tx, sig_rx) = mpsc::channel(1);
        let (_exit_tx, exit_rx) = mpsc::channel(1);

        let mut stopped = manager.cache().subscribe();
        sig_tx.send("SIGINT").await.unwrap();

        let err = supervise(&manager, &server, sig_rx, exit_rx)
            .await
            .unwrap_err();
        assert!(matches!(err, FatalError::GracefulClose { .. }));
        // The shutdown hook ran before the close attempt.
        assert!(stopped.try_recv().is_ok());
    }

    #[tokio::test]
    async fn repeated_signals_reenter_the_signal_branch() {
        let manager = test_manager();
        let server = StubServer::new(false);
        let (sig_tx, sig_rx) = mpsc::channel(2);
        let (exit_tx, exit_rx) = mpsc::channel(1);

        sig_tx.send("SIGTERM").await.unwrap();
        sig_tx.send("SIGTERM").await.unwrap();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            exit_tx.send(None).await.unwrap();
        });

        supervise(&manager, &server, sig_rx, exit_rx).await.unwrap();
        assert_eq!(server.close_count(), 2);
    }

    #[test]
    fn listen_addr_defaults_and_overrides() {
        let settings = Settings::from_pairs::<_, String, String>([]);
        assert_eq!(resolve_listen_addr(&settings), "3333");

        let settings = Settings::from_pairs([("listen_addr", "0.0.0.0:4444")]);
        assert_eq!(resolve_listen_addr(&settings), "0.0.0.0:4444");
    }

    #[test]
    fn keep_alive_defaults_and_overrides() {
        let settings = Settings::from_pairs::<_, String, String>([]);
        assert_eq!(
            resolve_keep_alive_max_age(&settings),
            Duration::from_secs(60)
        );

        let settings = Settings::from_pairs([("grpc_conn_max_seconds", "120")]);
        assert_eq!(
            resolve_keep_alive_max_age(&settings),
            Duration::from_secs(120)
        );
    }
}
