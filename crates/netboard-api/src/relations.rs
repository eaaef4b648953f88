// Relation and customer-assignment endpoints

use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use crate::client::PlatformClient;
use crate::error::Error;
use crate::models::EntityType;

/// Relation type used for every topology edge.
pub const CONTAINS: &str = "Contains";

impl PlatformClient {
    /// Create a directed relation edge between two known IDs.
    ///
    /// `POST /relation` with `{"from": {...}, "to": {...}, "type": "Contains"}`
    pub async fn create_relation(
        &self,
        from: (Uuid, EntityType),
        to: (Uuid, EntityType),
        relation_type: &str,
    ) -> Result<(), Error> {
        let url = self.api_url("relation")?;
        debug!(from = %from.0, to = %to.0, relation_type, "creating relation");
        let body = json!({
            "from": { "id": from.0, "entityType": from.1.wire_name() },
            "to": { "id": to.0, "entityType": to.1.wire_name() },
            "type": relation_type,
        });
        self.post_no_content(url, &body).await
    }

    /// Assign an asset or device to a customer.
    ///
    /// `POST /customer/{customerId}/{type}/{entityId}`
    pub async fn assign_to_customer(
        &self,
        customer_id: Uuid,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> Result<(), Error> {
        let url = self.api_url(&format!(
            "customer/{customer_id}/{}/{entity_id}",
            entity_type.path_segment()
        ))?;
        debug!(%customer_id, %entity_id, "assigning to customer");
        self.post_empty(url).await
    }
}
