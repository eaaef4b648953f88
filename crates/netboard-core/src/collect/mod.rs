// ── Device CLI collection boundary ──
//
// Streamers and live onboarding talk to switches through these traits.
// A session is opened, used for a handful of commands and closed within
// one polling round.

mod external;
mod snapshot;
mod testbed;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use external::{CommandTemplate, ExternalCollector, ExternalCollectorConfig};
pub use snapshot::{Snapshot, SnapshotStore, command_dir};
pub use testbed::{Testbed, TestbedConnection, TestbedDevice};

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("Cannot connect to {device}: {reason}")]
    Connection { device: String, reason: String },

    #[error("No parser available for '{command}' on {device}")]
    ParserNotFound { device: String, command: String },

    #[error("'{command}' on {device} produced no parsed output")]
    EmptyParse { device: String, command: String },

    #[error("'{command}' on {device} failed: {reason}")]
    Command {
        device: String,
        command: String,
        reason: String,
    },

    #[error("Snapshot IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid parsed output for '{command}' on {device}: {source}")]
    Json {
        device: String,
        command: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Source of device sessions, typically backed by a testbed inventory.
#[async_trait]
pub trait DeviceCollector: Send + Sync {
    /// Names of every device that can be polled.
    fn devices(&self) -> Vec<String>;

    /// Management address of a device, if known.
    fn address(&self, device: &str) -> Option<String>;

    async fn connect(&self, device: &str) -> Result<Box<dyn DeviceSession>, CollectError>;
}

/// An open CLI session on one device.
#[async_trait]
pub trait DeviceSession: Send {
    fn device(&self) -> &str;

    /// Run a show command and return its structured form.
    async fn parse(&mut self, command: &str) -> Result<Value, CollectError>;

    /// Run a command and return the raw CLI text.
    async fn execute(&mut self, command: &str) -> Result<String, CollectError>;

    async fn disconnect(self: Box<Self>);
}
