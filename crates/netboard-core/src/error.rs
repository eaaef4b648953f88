// ── Core error types ──
//
// Domain errors from netboard-core. Callers never see HTTP status codes
// or JSON parse failures directly: the `From<netboard_api::Error>` impl
// translates transport-layer errors into domain variants.

use thiserror::Error;

use crate::collect::CollectError;
use crate::topology::TopologyError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Request timed out")]
    Timeout,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Entity not found: {entity_type} '{name}'")]
    EntityNotFound { entity_type: String, name: String },

    #[error("Entity '{name}' is a {actual}, expected {expected}")]
    WrongEntityKind {
        name: String,
        expected: String,
        actual: String,
    },

    #[error(transparent)]
    Topology(#[from] TopologyError),

    // ── Operation errors ─────────────────────────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    #[error("MQTT error: {message}")]
    Mqtt { message: String },

    #[error(transparent)]
    Collect(#[from] CollectError),

    #[error("Export failed: {message}")]
    Export { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── IO / internal ────────────────────────────────────────────────
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// Returns `true` if this is an entity lookup failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::EntityNotFound { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<netboard_api::Error> for CoreError {
    fn from(err: netboard_api::Error) -> Self {
        match err {
            netboard_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            netboard_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            netboard_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            netboard_api::Error::Proxy { proxy, reason } => CoreError::Config {
                message: format!("Invalid proxy {proxy}: {reason}"),
            },
            netboard_api::Error::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            netboard_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
            netboard_api::Error::MqttConnect { broker, reason } => CoreError::ConnectionFailed {
                url: broker,
                reason,
            },
            netboard_api::Error::MqttPublish { topic, reason } => CoreError::Mqtt {
                message: format!("{topic}: {reason}"),
            },
        }
    }
}
