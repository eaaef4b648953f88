// Asset and device endpoints
//
// Devices and assets are looked up by name through the tenant-scoped
// listing endpoints; the platform answers with the single matching entity.

use secrecy::ExposeSecret;
use serde_json::json;
use tracing::debug;

use crate::client::PlatformClient;
use crate::error::Error;
use crate::models::{EntityType, GatewayCredentials, PlatformEntity};

impl PlatformClient {
    /// Resolve an asset or device by name.
    ///
    /// `GET /tenant/{type}s?{type}Name=...`. Customers are resolved by
    /// title instead, see [`PlatformClient::customer_by_title`].
    pub async fn entity_by_name(
        &self,
        entity_type: EntityType,
        name: &str,
    ) -> Result<PlatformEntity, Error> {
        if entity_type == EntityType::Customer {
            return self.customer_by_title(name).await;
        }
        let segment = entity_type.path_segment();
        let mut url = self.api_url(&format!("tenant/{segment}s"))?;
        url.query_pairs_mut()
            .append_pair(&format!("{segment}Name"), name);
        self.get(url).await
    }

    /// Create an asset.
    ///
    /// `POST /asset` with `{"name": "...", "type": "site"}`
    pub async fn create_asset(&self, name: &str, asset_type: &str) -> Result<PlatformEntity, Error> {
        let url = self.api_url("asset")?;
        debug!(name, asset_type, "creating asset");
        self.post(url, &json!({ "name": name, "type": asset_type }))
            .await
    }

    /// Create a device.
    ///
    /// `POST /device` with `{"name", "type", "additionalInfo": {"gateway": bool}}`
    pub async fn create_device(
        &self,
        name: &str,
        device_type: &str,
        gateway: bool,
    ) -> Result<PlatformEntity, Error> {
        let url = self.api_url("device")?;
        debug!(name, device_type, "creating device");
        self.post(url, &device_body(name, device_type, gateway))
            .await
    }

    /// Create a gateway device with MQTT basic credentials.
    ///
    /// `POST /device-with-credentials`. The credentials value is itself a
    /// JSON document serialized into a string, as the platform expects.
    pub async fn create_device_with_credentials(
        &self,
        name: &str,
        device_type: &str,
        credentials: &GatewayCredentials,
    ) -> Result<PlatformEntity, Error> {
        let url = self.api_url("device-with-credentials")?;
        debug!(name, device_type, "creating gateway device");

        let credentials_value = json!({
            "clientId": null,
            "userName": credentials.username,
            "password": credentials.password.expose_secret(),
        })
        .to_string();

        let body = json!({
            "device": device_body(name, device_type, true),
            "credentials": {
                "credentialsType": "MQTT_BASIC",
                "credentialsId": "",
                "credentialsValue": credentials_value,
            },
        });
        self.post(url, &body).await
    }
}

fn device_body(name: &str, device_type: &str, gateway: bool) -> serde_json::Value {
    json!({
        "name": name,
        "type": device_type,
        "additionalInfo": { "gateway": gateway },
    })
}
