use thiserror::Error;

/// Top-level error type for the `netboard-api` crate.
///
/// Covers every failure mode of the two remote surfaces: the platform's
/// REST API and the MQTT gateway broker. `netboard-core` maps these into
/// domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login failed or the bearer token was rejected.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Proxy configuration could not be applied.
    #[error("Invalid proxy {proxy}: {reason}")]
    Proxy { proxy: String, reason: String },

    // ── Platform API ────────────────────────────────────────────────
    /// Non-success response from a REST endpoint.
    #[error("Platform API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── MQTT ────────────────────────────────────────────────────────
    /// Broker connection could not be established.
    #[error("MQTT connection to {broker} failed: {reason}")]
    MqttConnect { broker: String, reason: String },

    /// Publish request rejected by the client queue.
    #[error("MQTT publish to {topic} failed: {reason}")]
    MqttPublish { topic: String, reason: String },
}

impl Error {
    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Api { status: 404, .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if the platform rejected a create because the name is taken.
    pub fn is_already_exists(&self) -> bool {
        match self {
            Self::Api { status, message } => {
                (*status == 400 || *status == 409)
                    && message.to_ascii_lowercase().contains("already exists")
            }
            _ => false,
        }
    }
}
