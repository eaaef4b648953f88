//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with help
//! text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use netboard_config::ConfigError;
use netboard_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to {url}")]
    #[diagnostic(
        code(netboard::connection_failed),
        help(
            "Check that the platform is reachable: {reason}\n\
             A proxy can be set with HTTPS_PROXY."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Broker error: {message}")]
    #[diagnostic(
        code(netboard::mqtt),
        help("Check the broker section of the platform file and the gateway credentials.")
    )]
    Mqtt { message: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(netboard::auth_failed),
        help(
            "Verify api.username and the password.\n\
             Set NETBOARD_API_PASSWORD or store it in the keyring (service 'netboard')."
        )
    )]
    AuthFailed { message: String },

    #[error("No {what} password configured")]
    #[diagnostic(
        code(netboard::no_credentials),
        help(
            "Set NETBOARD_API_PASSWORD or NETBOARD_BROKER_PASSWORD, store it in the\n\
             keyring (service 'netboard'), or add a password to the platform file."
        )
    )]
    NoCredentials { what: String },

    // ── Lookup ───────────────────────────────────────────────────────
    #[error("{entity_type} '{name}' not found on the platform")]
    #[diagnostic(code(netboard::not_found))]
    NotFound { entity_type: String, name: String },

    #[error("Required file not found: {path}")]
    #[diagnostic(
        code(netboard::file_not_found),
        help("Point netboard at it with the matching --*-file flag or the [paths] settings section.")
    )]
    FileNotFound { path: String },

    // ── Validation / configuration ───────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(netboard::validation))]
    Validation { field: String, reason: String },

    #[error("{message}")]
    #[diagnostic(code(netboard::config))]
    Config { message: String },

    // ── Operations ───────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(netboard::operation))]
    Operation { message: String },

    #[error("Onboarding finished with {failed} failed operation(s)")]
    #[diagnostic(
        code(netboard::incomplete),
        help("Every operation is idempotent; rerun after fixing the reported entities.")
    )]
    Incomplete { failed: usize },

    #[error("Request timed out")]
    #[diagnostic(code(netboard::timeout))]
    Timeout,

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Cannot render JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cannot render YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Mqtt { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::FileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } => exit_code::USAGE,
            Self::Timeout => exit_code::TIMEOUT,
            _ => exit_code::GENERAL,
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },
            CoreError::Timeout => Self::Timeout,
            CoreError::EntityNotFound { entity_type, name } => Self::NotFound { entity_type, name },
            CoreError::Mqtt { message } => Self::Mqtt { message },
            CoreError::Config { message } => Self::Config { message },
            other => Self::Operation {
                message: other.to_string(),
            },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Missing { path } => Self::FileNotFound {
                path: path.display().to_string(),
            },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::NoCredentials { what } => Self::NoCredentials { what },
            other => Self::Config {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_keep_their_exit_codes() {
        let err = CliError::from(CoreError::AuthenticationFailed {
            message: "bad".into(),
        });
        assert_eq!(err.exit_code(), exit_code::AUTH);

        let err = CliError::from(CoreError::EntityNotFound {
            entity_type: "customer".into(),
            name: "Acme".into(),
        });
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);

        let err = CliError::from(CoreError::Export {
            message: "disk full".into(),
        });
        assert_eq!(err.exit_code(), exit_code::GENERAL);
    }

    #[test]
    fn missing_files_are_not_found() {
        let err = CliError::from(ConfigError::Missing {
            path: "yaml/sites.yml".into(),
        });
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
        assert!(err.to_string().contains("yaml/sites.yml"));
    }
}
