// Password resolution: environment, then system keyring, then plaintext.

use secrecy::SecretString;
use tracing::debug;

use crate::ConfigError;

/// Keyring service under which netboard passwords are stored.
pub const KEYRING_SERVICE: &str = "netboard";

/// Which password is being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKind {
    /// Platform REST login.
    Api,
    /// MQTT broker / gateway device.
    Broker,
}

impl SecretKind {
    fn env_var(self) -> &'static str {
        match self {
            Self::Api => "NETBOARD_API_PASSWORD",
            Self::Broker => "NETBOARD_BROKER_PASSWORD",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Broker => "broker",
        }
    }

    /// Keyring entry name, `<kind>/<username>`.
    fn keyring_user(self, username: &str) -> String {
        format!("{}/{username}", self.label())
    }
}

/// Resolve a password for `username`.
///
/// 1. `NETBOARD_API_PASSWORD` / `NETBOARD_BROKER_PASSWORD`
/// 2. System keyring (service `netboard`, user `<kind>/<username>`)
/// 3. Plaintext from the platform file
pub fn resolve_password(
    kind: SecretKind,
    username: &str,
    plaintext: Option<&SecretString>,
) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(kind.env_var()) {
        if !value.is_empty() {
            debug!(kind = kind.label(), "password from environment");
            return Ok(SecretString::from(value));
        }
    }

    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &kind.keyring_user(username)) {
        if let Ok(secret) = entry.get_password() {
            debug!(kind = kind.label(), "password from keyring");
            return Ok(SecretString::from(secret));
        }
    }

    if let Some(secret) = plaintext {
        debug!(kind = kind.label(), "password from platform file");
        return Ok(secret.clone());
    }

    Err(ConfigError::NoCredentials {
        what: kind.label().into(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn environment_wins_over_plaintext() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("NETBOARD_BROKER_PASSWORD", "from-env");
            let file = SecretString::from(String::from("from-file"));
            let resolved = resolve_password(SecretKind::Broker, "gw", Some(&file)).unwrap();
            assert_eq!(resolved.expose_secret(), "from-env");
            Ok(())
        });
    }

    #[test]
    fn keyring_user_is_namespaced_by_kind() {
        assert_eq!(SecretKind::Api.keyring_user("tenant"), "api/tenant");
        assert_eq!(SecretKind::Broker.keyring_user("gw"), "broker/gw");
    }
}
