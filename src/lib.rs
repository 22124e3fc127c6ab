//! Authorization adapter bootstrap and lifecycle.
//!
//! Resolves environment-bound settings into the runtime policy objects the
//! authorizer and adapter server are constructed from, then supervises the
//! serving loop through startup, concurrent execution, and graceful shutdown.

pub mod authorizer;
pub mod client;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod metrics;
pub mod server;
pub mod settings;

pub use error::FatalError;
pub use settings::Settings;
