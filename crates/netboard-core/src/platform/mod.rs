// ── Platform boundary ──
//
// Everything the orchestrator and exporter need from the IoT platform,
// expressed over topology entities. Remote IDs are resolved by name inside
// each call; nothing is cached between calls.

mod rest;

use async_trait::async_trait;
use serde::Serialize;

pub use netboard_api::{GatewayCredentials, Timeseries, TimeseriesQuery};
pub use rest::RestPlatform;

use crate::error::CoreError;
use crate::model::{Entity, EntityId, EntityRef};

/// Result of a create/assign style operation that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Created,
    AlreadyExists,
    /// Nothing to do (no customer to assign to, no attributes to save).
    Skipped,
}

#[async_trait]
pub trait Platform: Send + Sync {
    async fn create_customer(&self, customer: &Entity) -> Result<Outcome, CoreError>;

    async fn customer_id(&self, name: &str) -> Result<EntityId, CoreError>;

    async fn create_asset(&self, asset: &Entity) -> Result<Outcome, CoreError>;

    async fn create_device(&self, device: &Entity) -> Result<Outcome, CoreError>;

    /// Create a gateway device that authenticates with MQTT basic credentials.
    async fn create_gateway(
        &self,
        device: &Entity,
        credentials: &GatewayCredentials,
    ) -> Result<Outcome, CoreError>;

    /// Save the device's attributes under the shared scope.
    async fn save_device_attributes(&self, device: &Entity) -> Result<Outcome, CoreError>;

    async fn entity_id(&self, entity: &EntityRef) -> Result<EntityId, CoreError>;

    /// Create a `Contains` edge from `parent` to `child`.
    ///
    /// Fails with [`CoreError::EntityNotFound`] without sending anything
    /// when either end cannot be resolved.
    async fn create_relation(
        &self,
        parent: &EntityRef,
        child: &EntityRef,
    ) -> Result<Outcome, CoreError>;

    /// Assign to a customer; [`Outcome::Skipped`] when `customer_id` is `None`.
    async fn assign_to_customer(
        &self,
        entity: &EntityRef,
        customer_id: Option<EntityId>,
    ) -> Result<Outcome, CoreError>;

    async fn read_historical_values(
        &self,
        device: &EntityRef,
        query: &TimeseriesQuery,
    ) -> Result<Timeseries, CoreError>;
}
