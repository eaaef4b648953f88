// netboard-api: Async Rust client for the IoT platform REST API and MQTT gateway

mod auth;
pub mod client;
pub mod customers;
pub mod entities;
pub mod error;
pub mod models;
pub mod mqtt;
pub mod relations;
pub mod telemetry;
pub mod transport;

pub use client::PlatformClient;
pub use error::Error;
pub use models::{
    Aggregation, EntityIdRef, EntityType, GatewayCredentials, PlatformEntity, Timeseries,
    TimeseriesQuery, TimeseriesSample,
};
pub use mqtt::{ATTRIBUTES_TOPIC, BrokerConfig, CONNECT_TOPIC, GatewayClient, TELEMETRY_TOPIC};
pub use relations::CONTAINS;
pub use transport::{TlsMode, TransportConfig};
