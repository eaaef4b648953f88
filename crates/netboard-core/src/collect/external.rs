// Collector that shells out to an external CLI-automation tool.
//
// Each command runs as its own process. Argument templates may reference
// `{device}`, `{command}`, `{ip}` and `{testbed}`; the parse program must
// print JSON on stdout and exit with status 3 when no parser exists for
// the command.

use std::path::PathBuf;
use std::process::Output;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::process::Command;
use tracing::debug;

use super::{CollectError, DeviceCollector, DeviceSession, Testbed};

/// Exit status the parse program uses for "no parser for this command".
const NO_PARSER_STATUS: i32 = 3;

/// A program plus argument templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandTemplate {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandTemplate {
    fn render(&self, vars: &[(&str, &str)]) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                vars.iter().fold(arg.clone(), |acc, (name, value)| {
                    acc.replace(&format!("{{{name}}}"), value)
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct ExternalCollectorConfig {
    pub parse: CommandTemplate,
    pub execute: CommandTemplate,
    /// Passed to the templates as `{testbed}`.
    pub testbed_file: Option<PathBuf>,
    pub timeout: Duration,
}

/// [`DeviceCollector`] running one external process per command.
pub struct ExternalCollector {
    testbed: Testbed,
    config: Arc<ExternalCollectorConfig>,
}

impl ExternalCollector {
    pub fn new(testbed: Testbed, config: ExternalCollectorConfig) -> Self {
        Self {
            testbed,
            config: Arc::new(config),
        }
    }
}

#[async_trait]
impl DeviceCollector for ExternalCollector {
    fn devices(&self) -> Vec<String> {
        self.testbed.device_names()
    }

    fn address(&self, device: &str) -> Option<String> {
        self.testbed.cli_address(device).map(str::to_owned)
    }

    async fn connect(&self, device: &str) -> Result<Box<dyn DeviceSession>, CollectError> {
        if !self.testbed.devices.contains_key(device) {
            return Err(CollectError::Connection {
                device: device.to_owned(),
                reason: "device is not in the testbed".into(),
            });
        }
        Ok(Box::new(ExternalSession {
            device: device.to_owned(),
            ip: self.address(device).unwrap_or_default(),
            config: Arc::clone(&self.config),
        }))
    }
}

struct ExternalSession {
    device: String,
    ip: String,
    config: Arc<ExternalCollectorConfig>,
}

impl ExternalSession {
    async fn run(&self, template: &CommandTemplate, command: &str) -> Result<Output, CollectError> {
        let testbed = self
            .config
            .testbed_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let args = template.render(&[
            ("device", &self.device),
            ("command", command),
            ("ip", &self.ip),
            ("testbed", &testbed),
        ]);
        debug!(device = %self.device, command, program = %template.program, "running collector");

        let child = Command::new(&template.program)
            .args(&args)
            .kill_on_drop(true)
            .output();
        match tokio::time::timeout(self.config.timeout, child).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(CollectError::Connection {
                device: self.device.clone(),
                reason: format!("cannot start {}: {e}", template.program),
            }),
            Err(_) => Err(CollectError::Connection {
                device: self.device.clone(),
                reason: format!("timed out after {}s", self.config.timeout.as_secs()),
            }),
        }
    }

    fn failure(&self, command: &str, output: &Output) -> CollectError {
        if output.status.code() == Some(NO_PARSER_STATUS) {
            return CollectError::ParserNotFound {
                device: self.device.clone(),
                command: command.to_owned(),
            };
        }
        CollectError::Command {
            device: self.device.clone(),
            command: command.to_owned(),
            reason: format!(
                "{}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        }
    }
}

#[async_trait]
impl DeviceSession for ExternalSession {
    fn device(&self) -> &str {
        &self.device
    }

    async fn parse(&mut self, command: &str) -> Result<Value, CollectError> {
        let output = self.run(&self.config.parse, command).await?;
        if !output.status.success() {
            return Err(self.failure(command, &output));
        }

        let value: Value =
            serde_json::from_slice(&output.stdout).map_err(|source| CollectError::Json {
                device: self.device.clone(),
                command: command.to_owned(),
                source,
            })?;
        let empty = match &value {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            _ => false,
        };
        if empty {
            return Err(CollectError::EmptyParse {
                device: self.device.clone(),
                command: command.to_owned(),
            });
        }
        Ok(value)
    }

    async fn execute(&mut self, command: &str) -> Result<String, CollectError> {
        let output = self.run(&self.config.execute, command).await?;
        if !output.status.success() {
            return Err(self.failure(command, &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn disconnect(self: Box<Self>) {
        debug!(device = %self.device, "session closed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::collect::{TestbedConnection, TestbedDevice};

    fn testbed() -> Testbed {
        let mut device = TestbedDevice::default();
        device.connections.insert(
            "cli".into(),
            TestbedConnection {
                ip: Some("10.1.1.1".into()),
                ..TestbedConnection::default()
            },
        );
        let mut testbed = Testbed::default();
        testbed.devices.insert("SW1".into(), device);
        testbed
    }

    fn sh(script: &str) -> CommandTemplate {
        CommandTemplate {
            program: "sh".into(),
            args: vec![
                "-c".into(),
                script.into(),
                "sh".into(),
                "{device}".into(),
                "{command}".into(),
                "{ip}".into(),
            ],
        }
    }

    fn collector(parse: &str, execute: &str) -> ExternalCollector {
        ExternalCollector::new(
            testbed(),
            ExternalCollectorConfig {
                parse: sh(parse),
                execute: sh(execute),
                testbed_file: None,
                timeout: Duration::from_secs(10),
            },
        )
    }

    #[test]
    fn render_substitutes_placeholders() {
        let template = CommandTemplate {
            program: "collect".into(),
            args: vec!["--device={device}".into(), "{command}".into()],
        };
        assert_eq!(
            template.render(&[("device", "SW1"), ("command", "show version")]),
            ["--device=SW1", "show version"]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn parse_reads_json_from_stdout() {
        let collector = collector(
            r#"printf '{"device": "%s", "command": "%s", "ip": "%s"}' "$1" "$2" "$3""#,
            "true",
        );
        let mut session = collector.connect("SW1").await.unwrap();
        let value = session.parse("show version").await.unwrap();
        assert_eq!(value["device"], "SW1");
        assert_eq!(value["command"], "show version");
        assert_eq!(value["ip"], "10.1.1.1");
        session.disconnect().await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn exit_status_three_means_no_parser() {
        let collector = collector("exit 3", "true");
        let mut session = collector.connect("SW1").await.unwrap();
        let err = session.parse("show energywise").await.unwrap_err();
        assert!(matches!(err, CollectError::ParserNotFound { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn empty_object_is_empty_parse() {
        let collector = collector("printf '{}'", "true");
        let mut session = collector.connect("SW1").await.unwrap();
        let err = session.parse("show power inline").await.unwrap_err();
        assert!(matches!(err, CollectError::EmptyParse { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn execute_returns_raw_text() {
        let collector = collector("true", r#"printf 'output of %s' "$2""#);
        let mut session = collector.connect("SW1").await.unwrap();
        let text = session.execute("show int status").await.unwrap();
        assert_eq!(text, "output of show int status");
    }

    #[tokio::test]
    async fn unknown_device_fails_to_connect() {
        let collector = collector("true", "true");
        let result = collector.connect("SW9").await;
        assert!(matches!(result, Err(CollectError::Connection { .. })));
    }
}
