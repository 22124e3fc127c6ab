//! Outbound HTTP client construction.
//!
//! # Responsibilities
//! - Resolve timeout and TLS settings into a `ClientConfig`
//! - Build the `reqwest::Client` the authorizer uses for upstream calls
//!
//! # Design Decisions
//! - Resolution is pure and filesystem-free; all file IO happens in `build`
//! - `tls` is `Some` only when a TLS-affecting setting was supplied, even if
//!   the supplied value is falsy. When it is `None`, no TLS builder method is
//!   invoked at all and the platform default transport applies untouched.
//! - Partial client cert/key pairs are fatal at resolution time, before any
//!   file is opened

use std::path::PathBuf;
use std::time::Duration;

use crate::error::FatalError;
use crate::settings::Settings;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolved outbound client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Request timeout; zero disables the deadline entirely.
    pub timeout: Duration,
    pub tls: Option<TlsMaterial>,
}

/// TLS trust material layered onto the platform defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsMaterial {
    /// Skip upstream certificate verification.
    pub insecure_skip_verify: bool,
    /// Extra root CA bundle appended to the default trust roots.
    pub root_ca: Option<PathBuf>,
    /// Client certificate and key paths for mutual TLS.
    pub identity: Option<(PathBuf, PathBuf)>,
}

impl ClientConfig {
    /// Resolve client settings. Later steps layer onto earlier ones: each
    /// TLS-affecting setting that is present marks the TLS config in use.
    pub fn resolve(settings: &Settings) -> Result<Self, FatalError> {
        let mut timeout = DEFAULT_TIMEOUT;
        if settings.is_set("client_timeout_seconds") {
            timeout = Duration::from_secs(settings.get_int("client_timeout_seconds").max(0) as u64);
        }

        let mut tls = TlsMaterial::default();
        let mut use_tls = false;

        if settings.is_set("allow_insecure_conn") {
            tls.insecure_skip_verify = settings.get_bool("allow_insecure_conn");
            use_tls = true;
        }

        if settings.is_set("root_ca") {
            let path = settings.get_string("root_ca");
            if !path.is_empty() {
                tls.root_ca = Some(PathBuf::from(path));
                use_tls = true;
            }
        }

        if settings.is_set("client_cert") {
            let cert = settings.get_string("client_cert");
            if !cert.is_empty() && settings.is_set("client_key") {
                let key = settings.get_string("client_key");
                if key.is_empty() {
                    return Err(FatalError::EmptyClientKey);
                }
                tls.identity = Some((PathBuf::from(cert), PathBuf::from(key)));
                use_tls = true;
            } else {
                return Err(FatalError::IncompleteClientPair);
            }
        }

        Ok(Self {
            timeout,
            tls: use_tls.then_some(tls),
        })
    }

    /// Build the configured `reqwest::Client`. Unreadable or unparseable
    /// TLS material is fatal; no partial client is returned.
    pub fn build(self) -> Result<reqwest::Client, FatalError> {
        let mut builder = reqwest::Client::builder();
        // A zero timeout means no deadline, not an instantly-expired one.
        if !self.timeout.is_zero() {
            builder = builder.timeout(self.timeout);
        }

        let Some(tls) = self.tls else {
            return builder.build().map_err(FatalError::ClientBuild);
        };

        if tls.insecure_skip_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(path) = &tls.root_ca {
            let pem = std::fs::read(path).map_err(|source| FatalError::RootCaRead {
                path: path.clone(),
                source,
            })?;
            // Appended roots layer onto the built-in platform roots rather
            // than replacing them.
            let certs = reqwest::Certificate::from_pem_bundle(&pem).map_err(|source| {
                FatalError::RootCaParse {
                    path: path.clone(),
                    source,
                }
            })?;
            for cert in certs {
                builder = builder.add_root_certificate(cert);
            }
        }

        if let Some((cert_path, key_path)) = &tls.identity {
            let mut pem = std::fs::read(cert_path).map_err(|source| FatalError::IdentityRead {
                path: cert_path.clone(),
                source,
            })?;
            let key = std::fs::read(key_path).map_err(|source| FatalError::IdentityRead {
                path: key_path.clone(),
                source,
            })?;
            pem.extend_from_slice(&key);
            let identity =
                reqwest::Identity::from_pem(&pem).map_err(|source| FatalError::IdentityParse {
                    cert: cert_path.clone(),
                    key: key_path.clone(),
                    source,
                })?;
            builder = builder.identity(identity);
        }

        builder.build().map_err(FatalError::ClientBuild)
    }
}
