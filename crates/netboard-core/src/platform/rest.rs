// REST implementation of the platform boundary.

use std::collections::BTreeMap;

use async_trait::async_trait;
use netboard_api::{PlatformClient, PlatformEntity, TransportConfig};
use secrecy::SecretString;
use tracing::{debug, info};
use url::Url;

use super::{GatewayCredentials, Outcome, Platform, Timeseries, TimeseriesQuery};
use crate::error::CoreError;
use crate::model::{Entity, EntityId, EntityKind, EntityRef, EntityType};

/// [`Platform`] backed by [`PlatformClient`].
pub struct RestPlatform {
    client: PlatformClient,
}

impl RestPlatform {
    pub fn new(client: PlatformClient) -> Self {
        Self { client }
    }

    /// Authenticate against `base_url` and wrap the resulting client.
    pub async fn connect(
        base_url: Url,
        username: &str,
        password: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, CoreError> {
        let client = PlatformClient::login(base_url, username, password, transport).await?;
        info!(url = %client.base_url(), "authenticated with platform");
        Ok(Self::new(client))
    }

    fn expect_kind(entity: &Entity, expected: EntityType) -> Result<(), CoreError> {
        if entity.entity_type() == expected {
            Ok(())
        } else {
            Err(CoreError::WrongEntityKind {
                name: entity.name.clone(),
                expected: expected.to_string(),
                actual: entity.entity_type().to_string(),
            })
        }
    }
}

/// Fold a create call into an [`Outcome`], treating duplicates as success.
fn creation(
    result: Result<PlatformEntity, netboard_api::Error>,
    entity: &Entity,
) -> Result<Outcome, CoreError> {
    match result {
        Ok(_) => {
            info!(name = %entity.name, kind = entity.kind.subtype(), "created");
            Ok(Outcome::Created)
        }
        Err(e) if e.is_already_exists() => {
            info!(name = %entity.name, kind = entity.kind.subtype(), "already exists");
            Ok(Outcome::AlreadyExists)
        }
        Err(e) => Err(e.into()),
    }
}

fn not_found(entity: &EntityRef) -> impl FnOnce(netboard_api::Error) -> CoreError + '_ {
    move |e| {
        if e.is_not_found() {
            CoreError::EntityNotFound {
                entity_type: entity.entity_type.to_string(),
                name: entity.name.clone(),
            }
        } else {
            e.into()
        }
    }
}

#[async_trait]
impl Platform for RestPlatform {
    async fn create_customer(&self, customer: &Entity) -> Result<Outcome, CoreError> {
        Self::expect_kind(customer, EntityType::Customer)?;
        creation(self.client.create_customer(&customer.name).await, customer)
    }

    async fn customer_id(&self, name: &str) -> Result<EntityId, CoreError> {
        let customer = EntityRef::new(name, EntityType::Customer);
        let found = self
            .client
            .customer_by_title(name)
            .await
            .map_err(not_found(&customer))?;
        debug!(name, id = %found.id.id, "resolved customer");
        Ok(found.id.id.into())
    }

    async fn create_asset(&self, asset: &Entity) -> Result<Outcome, CoreError> {
        Self::expect_kind(asset, EntityType::Asset)?;
        creation(
            self.client
                .create_asset(&asset.name, asset.kind.subtype())
                .await,
            asset,
        )
    }

    async fn create_device(&self, device: &Entity) -> Result<Outcome, CoreError> {
        Self::expect_kind(device, EntityType::Device)?;
        let gateway = matches!(
            device.kind,
            EntityKind::Device(crate::model::DeviceType::Gateway)
        );
        creation(
            self.client
                .create_device(&device.name, device.kind.subtype(), gateway)
                .await,
            device,
        )
    }

    async fn create_gateway(
        &self,
        device: &Entity,
        credentials: &GatewayCredentials,
    ) -> Result<Outcome, CoreError> {
        Self::expect_kind(device, EntityType::Device)?;
        creation(
            self.client
                .create_device_with_credentials(&device.name, device.kind.subtype(), credentials)
                .await,
            device,
        )
    }

    async fn save_device_attributes(&self, device: &Entity) -> Result<Outcome, CoreError> {
        if device.attributes.is_empty() {
            return Ok(Outcome::Skipped);
        }
        let id = self.entity_id(&device.to_ref()).await?;
        let attributes: BTreeMap<String, String> = device
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        self.client
            .save_shared_attributes(id.into(), &attributes)
            .await?;
        info!(name = %device.name, %id, "saved attributes");
        Ok(Outcome::Created)
    }

    async fn entity_id(&self, entity: &EntityRef) -> Result<EntityId, CoreError> {
        let found = self
            .client
            .entity_by_name(entity.entity_type.into(), &entity.name)
            .await
            .map_err(not_found(entity))?;
        debug!(name = %found.display_name(), id = %found.id.id, "resolved entity");
        Ok(found.id.id.into())
    }

    async fn create_relation(
        &self,
        parent: &EntityRef,
        child: &EntityRef,
    ) -> Result<Outcome, CoreError> {
        let parent_id = self.entity_id(parent).await?;
        let child_id = self.entity_id(child).await?;
        self.client
            .create_relation(
                (parent_id.into(), parent.entity_type.into()),
                (child_id.into(), child.entity_type.into()),
                netboard_api::CONTAINS,
            )
            .await?;
        info!(parent = %parent.name, child = %child.name, "created relation");
        Ok(Outcome::Created)
    }

    async fn assign_to_customer(
        &self,
        entity: &EntityRef,
        customer_id: Option<EntityId>,
    ) -> Result<Outcome, CoreError> {
        let Some(customer_id) = customer_id else {
            return Ok(Outcome::Skipped);
        };
        let id = self.entity_id(entity).await?;
        self.client
            .assign_to_customer(customer_id.into(), entity.entity_type.into(), id.into())
            .await?;
        info!(name = %entity.name, customer = %customer_id, "assigned to customer");
        Ok(Outcome::Created)
    }

    async fn read_historical_values(
        &self,
        device: &EntityRef,
        query: &TimeseriesQuery,
    ) -> Result<Timeseries, CoreError> {
        let id = self.entity_id(device).await?;
        let series = self
            .client
            .timeseries(device.entity_type.into(), id.into(), query)
            .await?;
        debug!(
            name = %device.name,
            start = query.start_ts,
            end = query.end_ts,
            "retrieved historical values"
        );
        Ok(series)
    }
}
