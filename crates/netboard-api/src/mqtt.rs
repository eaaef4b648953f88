// MQTT gateway client
//
// Thin wrapper over `rumqttc::AsyncClient` for the platform's gateway API.
// A connection is established eagerly (retrying until the broker sends a
// successful CONNACK), after which the event loop is driven by a
// background task until `disconnect` is called.

use std::time::Duration;

use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Outgoing, Packet, Proxy,
    ProxyAuth, ProxyType, QoS,
};
use secrecy::{ExposeSecret, SecretString};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::Error;

/// Announce a device behind the gateway: `{"device": "<name>"}`.
pub const CONNECT_TOPIC: &str = "v1/gateway/connect";
/// Client-side attributes keyed by device name.
pub const ATTRIBUTES_TOPIC: &str = "v1/gateway/attributes";
/// Telemetry keyed by device name.
pub const TELEMETRY_TOPIC: &str = "v1/gateway/telemetry";

/// How the gateway connects to its broker.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub client_id: String,
    pub keep_alive: Duration,
    /// Delay between connection attempts.
    pub connect_retry: Duration,
    /// Give up after this many attempts; `None` retries forever.
    pub max_connect_attempts: Option<u32>,
    /// HTTP CONNECT proxy (`http://[user:pass@]host:port`).
    pub proxy: Option<String>,
}

impl BrokerConfig {
    pub fn new(host: impl Into<String>, port: u16, username: impl Into<String>, password: SecretString) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password,
            client_id: format!("netboard-{}", uuid::Uuid::new_v4().simple()),
            keep_alive: Duration::from_secs(60),
            connect_retry: Duration::from_secs(1),
            max_connect_attempts: None,
            proxy: None,
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn options(&self) -> Result<MqttOptions, Error> {
        let mut options = MqttOptions::new(self.client_id.clone(), self.host.clone(), self.port);
        options.set_keep_alive(self.keep_alive);
        options.set_credentials(self.username.clone(), self.password.expose_secret());
        if let Some(ref proxy) = self.proxy {
            options.set_proxy(http_proxy(proxy)?);
        }
        Ok(options)
    }
}

fn http_proxy(proxy: &str) -> Result<Proxy, Error> {
    let invalid = |reason: &str| Error::Proxy {
        proxy: proxy.to_owned(),
        reason: reason.to_owned(),
    };
    let url = Url::parse(proxy).map_err(|e| invalid(&e.to_string()))?;
    let addr = url
        .host_str()
        .ok_or_else(|| invalid("missing host"))?
        .to_owned();
    let port = url.port_or_known_default().unwrap_or(8080);
    let auth = if url.username().is_empty() {
        ProxyAuth::None
    } else {
        ProxyAuth::Basic {
            username: url.username().to_owned(),
            password: url.password().unwrap_or_default().to_owned(),
        }
    };
    Ok(Proxy {
        ty: ProxyType::Http,
        auth,
        addr,
        port,
    })
}

/// A live gateway connection.
pub struct GatewayClient {
    client: AsyncClient,
    broker: String,
    pump: JoinHandle<()>,
}

impl GatewayClient {
    /// Connect to the broker, retrying every `connect_retry` until accepted.
    pub async fn connect(config: &BrokerConfig) -> Result<Self, Error> {
        let broker = config.address();
        let (client, mut eventloop) = AsyncClient::new(config.options()?, 64);

        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack)))
                    if ack.code == ConnectReturnCode::Success =>
                {
                    break;
                }
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    warn!(%broker, code = ?ack.code, "broker refused connection");
                }
                Ok(_) => continue,
                Err(e) => {
                    warn!(%broker, error = %e, "broker connection failed, retrying");
                }
            }

            if config.max_connect_attempts.is_some_and(|max| attempts >= max) {
                return Err(Error::MqttConnect {
                    broker,
                    reason: format!("gave up after {attempts} attempts"),
                });
            }
            tokio::time::sleep(config.connect_retry).await;
        }

        info!(%broker, "connected to MQTT broker");
        let pump = tokio::spawn(drive(eventloop, broker.clone()));
        Ok(Self {
            client,
            broker,
            pump,
        })
    }

    /// Publish a JSON payload with QoS 1, no retain.
    pub async fn publish_json(
        &self,
        topic: &str,
        payload: &serde_json::Value,
    ) -> Result<(), Error> {
        let bytes = serde_json::to_vec(payload).map_err(|e| Error::MqttPublish {
            topic: topic.to_owned(),
            reason: e.to_string(),
        })?;
        trace!(topic, bytes = bytes.len(), "publishing");
        self.client
            .publish(topic, QoS::AtLeastOnce, false, bytes)
            .await
            .map_err(|e| Error::MqttPublish {
                topic: topic.to_owned(),
                reason: e.to_string(),
            })
    }

    /// Send DISCONNECT and wait for the event loop to wind down.
    pub async fn disconnect(self) {
        if let Err(e) = self.client.disconnect().await {
            debug!(broker = %self.broker, error = %e, "disconnect request failed");
        }
        if tokio::time::timeout(Duration::from_secs(5), self.pump)
            .await
            .is_err()
        {
            debug!(broker = %self.broker, "event loop did not stop in time");
        }
        info!(broker = %self.broker, "disconnected from MQTT broker");
    }
}

async fn drive(mut eventloop: EventLoop, broker: String) {
    let mut acked = 0usize;
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::PubAck(_))) => acked += 1,
            Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(%broker, error = %e, "event loop stopped");
                break;
            }
        }
    }
    debug!(%broker, acked, "event loop finished");
}
