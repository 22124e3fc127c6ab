//! OS signal handling.
//!
//! # Responsibilities
//! - Register SIGTERM and SIGINT handlers
//! - Translate signal arrivals into supervise-loop events
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - The listener runs for the process lifetime and forwards every arrival;
//!   deciding what repeated signals mean is the supervise loop's business
//! - No other signals are intercepted

use tokio::sync::mpsc;

/// Spawn the signal listener task and return the channel it feeds.
pub fn spawn_signal_listener() -> mpsc::Receiver<&'static str> {
    let (tx, rx) = mpsc::channel(1);
    tokio::spawn(listen(tx));
    rx
}

#[cfg(unix)]
async fn listen(tx: mpsc::Sender<&'static str>) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(err) => {
            tracing::error!(error = %err, "failed to install SIGTERM handler");
            return;
        }
    };
    let mut interrupt = match signal(SignalKind::interrupt()) {
        Ok(stream) => stream,
        Err(err) => {
            tracing::error!(error = %err, "failed to install SIGINT handler");
            return;
        }
    };

    loop {
        let name = tokio::select! {
            _ = terminate.recv() => "SIGTERM",
            _ = interrupt.recv() => "SIGINT",
        };
        if tx.send(name).await.is_err() {
            return;
        }
    }
}

#[cfg(not(unix))]
async fn listen(tx: mpsc::Sender<&'static str>) {
    loop {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        if tx.send("interrupt").await.is_err() {
            return;
        }
    }
}
