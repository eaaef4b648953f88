#![allow(dead_code, clippy::unwrap_used)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use netboard_api::{GatewayCredentials, Timeseries, TimeseriesQuery};
use netboard_core::collect::{CollectError, DeviceCollector, DeviceSession};
use netboard_core::stream::{GatewayPublisher, PublisherFactory};
use netboard_core::{CoreError, Entity, EntityId, EntityRef, Outcome, Platform};

pub const CUSTOMER_ID: u128 = 0xAC3E;

/// Platform double that records every call as a line of text.
#[derive(Default)]
pub struct RecordingPlatform {
    calls: Mutex<Vec<String>>,
    /// Names that fail ID resolution.
    pub missing: HashSet<String>,
    /// `(device, start_ts)` → series returned for that read.
    pub series: HashMap<(String, i64), Timeseries>,
}

impl RecordingPlatform {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn push(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn resolve(&self, entity: &EntityRef) -> Result<EntityId, CoreError> {
        if self.missing.contains(&entity.name) {
            return Err(CoreError::EntityNotFound {
                entity_type: entity.entity_type.to_string(),
                name: entity.name.clone(),
            });
        }
        Ok(Uuid::from_u128(entity.name.bytes().map(u128::from).sum()).into())
    }
}

#[async_trait]
impl Platform for RecordingPlatform {
    async fn create_customer(&self, customer: &Entity) -> Result<Outcome, CoreError> {
        self.push(format!("create customer {}", customer.name));
        Ok(Outcome::Created)
    }

    async fn customer_id(&self, name: &str) -> Result<EntityId, CoreError> {
        self.push(format!("customer id {name}"));
        if self.missing.contains(name) {
            return Err(CoreError::EntityNotFound {
                entity_type: "customer".into(),
                name: name.into(),
            });
        }
        Ok(Uuid::from_u128(CUSTOMER_ID).into())
    }

    async fn create_asset(&self, asset: &Entity) -> Result<Outcome, CoreError> {
        self.push(format!("create asset {}", asset.name));
        Ok(Outcome::Created)
    }

    async fn create_device(&self, device: &Entity) -> Result<Outcome, CoreError> {
        self.push(format!("create device {}", device.name));
        Ok(Outcome::Created)
    }

    async fn create_gateway(
        &self,
        device: &Entity,
        credentials: &GatewayCredentials,
    ) -> Result<Outcome, CoreError> {
        self.push(format!("create gateway {} as {}", device.name, credentials.username));
        Ok(Outcome::Created)
    }

    async fn save_device_attributes(&self, device: &Entity) -> Result<Outcome, CoreError> {
        let attrs: Vec<String> = device
            .attributes
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        self.push(format!("save attributes {} ({})", device.name, attrs.join(", ")));
        Ok(if attrs.is_empty() {
            Outcome::Skipped
        } else {
            Outcome::Created
        })
    }

    async fn entity_id(&self, entity: &EntityRef) -> Result<EntityId, CoreError> {
        self.resolve(entity)
    }

    async fn create_relation(&self, parent: &EntityRef, child: &EntityRef) -> Result<Outcome, CoreError> {
        self.resolve(parent)?;
        self.resolve(child)?;
        self.push(format!("relate {} -> {}", parent.name, child.name));
        Ok(Outcome::Created)
    }

    async fn assign_to_customer(
        &self,
        entity: &EntityRef,
        customer_id: Option<EntityId>,
    ) -> Result<Outcome, CoreError> {
        let Some(customer_id) = customer_id else {
            self.push(format!("skip assign {}", entity.name));
            return Ok(Outcome::Skipped);
        };
        self.resolve(entity)?;
        let customer = if *customer_id.as_uuid() == Uuid::from_u128(CUSTOMER_ID) {
            "Acme".to_owned()
        } else {
            customer_id.to_string()
        };
        self.push(format!("assign {} -> {customer}", entity.name));
        Ok(Outcome::Created)
    }

    async fn read_historical_values(
        &self,
        device: &EntityRef,
        query: &TimeseriesQuery,
    ) -> Result<Timeseries, CoreError> {
        self.push(format!("read {} {}", device.name, query.start_ts));
        self.series
            .get(&(device.name.clone(), query.start_ts))
            .cloned()
            .ok_or_else(|| CoreError::Api {
                message: "Internal server error".into(),
                status: Some(500),
            })
    }
}

/// Publisher double: records `(topic, payload)` and optionally fails.
#[derive(Default)]
pub struct RecordingPublisher {
    pub published: Mutex<Vec<(String, Value)>>,
    /// Publish calls with these indices fail.
    pub fail_on: HashSet<usize>,
}

#[async_trait]
impl GatewayPublisher for RecordingPublisher {
    async fn publish(&self, topic: &str, payload: &Value) -> Result<(), CoreError> {
        let mut published = self.published.lock().unwrap();
        let index = published.len();
        published.push((topic.to_owned(), payload.clone()));
        if self.fail_on.contains(&index) {
            return Err(CoreError::Mqtt {
                message: "connection reset".into(),
            });
        }
        Ok(())
    }

    async fn disconnect(self: Box<Self>) {}
}

/// Factory handing out publishers that share one log.
#[derive(Default)]
pub struct SharedLogFactory {
    pub log: std::sync::Arc<Mutex<Vec<(String, Value)>>>,
    pub connects: Mutex<usize>,
}

struct SharedLogPublisher {
    log: std::sync::Arc<Mutex<Vec<(String, Value)>>>,
}

#[async_trait]
impl GatewayPublisher for SharedLogPublisher {
    async fn publish(&self, topic: &str, payload: &Value) -> Result<(), CoreError> {
        self.log
            .lock()
            .unwrap()
            .push((topic.to_owned(), payload.clone()));
        Ok(())
    }

    async fn disconnect(self: Box<Self>) {}
}

#[async_trait]
impl PublisherFactory for SharedLogFactory {
    async fn connect(&self) -> Result<Box<dyn GatewayPublisher>, CoreError> {
        *self.connects.lock().unwrap() += 1;
        Ok(Box::new(SharedLogPublisher {
            log: std::sync::Arc::clone(&self.log),
        }))
    }
}

/// Collector double serving canned parsed output per `(device, command)`.
#[derive(Default, Clone)]
pub struct CannedCollector {
    pub parsed: BTreeMap<(String, String), Value>,
    pub raw: BTreeMap<(String, String), String>,
    pub unreachable: HashSet<String>,
    pub devices: Vec<String>,
}

impl CannedCollector {
    pub fn with_parsed(mut self, device: &str, command: &str, value: Value) -> Self {
        if !self.devices.iter().any(|d| d == device) {
            self.devices.push(device.to_owned());
        }
        self.parsed
            .insert((device.to_owned(), command.to_owned()), value);
        self
    }

    pub fn with_raw(mut self, device: &str, command: &str, text: &str) -> Self {
        self.raw
            .insert((device.to_owned(), command.to_owned()), text.to_owned());
        self
    }
}

struct CannedSession {
    device: String,
    collector: CannedCollector,
}

#[async_trait]
impl DeviceCollector for CannedCollector {
    fn devices(&self) -> Vec<String> {
        self.devices.clone()
    }

    fn address(&self, device: &str) -> Option<String> {
        Some(format!("192.0.2.{}", device.len()))
    }

    async fn connect(&self, device: &str) -> Result<Box<dyn DeviceSession>, CollectError> {
        if self.unreachable.contains(device) {
            return Err(CollectError::Connection {
                device: device.to_owned(),
                reason: "timed out".into(),
            });
        }
        Ok(Box::new(CannedSession {
            device: device.to_owned(),
            collector: self.clone(),
        }))
    }
}

#[async_trait]
impl DeviceSession for CannedSession {
    fn device(&self) -> &str {
        &self.device
    }

    async fn parse(&mut self, command: &str) -> Result<Value, CollectError> {
        self.collector
            .parsed
            .get(&(self.device.clone(), command.to_owned()))
            .cloned()
            .ok_or_else(|| CollectError::ParserNotFound {
                device: self.device.clone(),
                command: command.to_owned(),
            })
    }

    async fn execute(&mut self, command: &str) -> Result<String, CollectError> {
        self.collector
            .raw
            .get(&(self.device.clone(), command.to_owned()))
            .cloned()
            .ok_or_else(|| CollectError::Command {
                device: self.device.clone(),
                command: command.to_owned(),
                reason: "unknown command".into(),
            })
    }

    async fn disconnect(self: Box<Self>) {}
}
