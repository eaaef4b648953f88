// Shared transport configuration for building reqwest::Client instances.
//
// The REST client and the MQTT gateway both honour the same proxy setting,
// so it lives here next to the TLS and timeout knobs.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};

use crate::error::Error;

/// Environment variable consulted for an outbound proxy.
pub const PROXY_ENV: &str = "HTTPS_PROXY";

/// TLS verification mode for the platform endpoint.
#[derive(Debug, Clone)]
pub enum TlsMode {
    /// Use the system certificate store.
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (for self-signed lab deployments).
    DangerAcceptInvalid,
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
    /// Proxy URL applied to every scheme (`http://host:port`).
    pub proxy: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::System,
            timeout: Duration::from_secs(10),
            proxy: None,
        }
    }
}

impl TransportConfig {
    /// Pick up the proxy from `HTTPS_PROXY` when it is set and non-empty.
    pub fn with_env_proxy(mut self) -> Self {
        self.proxy = std::env::var(PROXY_ENV).ok().filter(|p| !p.is_empty());
        self
    }

    /// Build a `reqwest::Client` from this config.
    ///
    /// Every request sends `accept: application/json`; JSON bodies set
    /// their own content type.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("netboard/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers);

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path).map_err(|e| Error::Api {
                    status: 0,
                    message: format!("failed to read CA cert {}: {e}", path.display()),
                })?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        if let Some(ref proxy) = self.proxy {
            let proxy = reqwest::Proxy::all(proxy.as_str()).map_err(|e| Error::Proxy {
                proxy: proxy.clone(),
                reason: e.to_string(),
            })?;
            builder = builder.proxy(proxy);
        }

        Ok(builder.build()?)
    }
}
