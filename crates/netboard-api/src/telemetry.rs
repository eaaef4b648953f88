// Attribute and time-series endpoints

use std::collections::BTreeMap;

use tracing::debug;
use uuid::Uuid;

use crate::client::PlatformClient;
use crate::error::Error;
use crate::models::{EntityType, Timeseries, TimeseriesQuery};

impl PlatformClient {
    /// Save attributes under the shared scope (client scope is not writable
    /// through the REST API).
    ///
    /// `POST /plugins/telemetry/{entityId}/SHARED_SCOPE`
    pub async fn save_shared_attributes(
        &self,
        entity_id: Uuid,
        attributes: &BTreeMap<String, String>,
    ) -> Result<(), Error> {
        let url = self.api_url(&format!("plugins/telemetry/{entity_id}/SHARED_SCOPE"))?;
        debug!(%entity_id, count = attributes.len(), "saving shared attributes");
        self.post_no_content(url, attributes).await
    }

    /// Read historical values for an entity.
    ///
    /// `GET /plugins/telemetry/{TYPE}/{entityId}/values/timeseries?startTs=..&endTs=..`
    pub async fn timeseries(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
        query: &TimeseriesQuery,
    ) -> Result<Timeseries, Error> {
        let mut url = self.api_url(&format!(
            "plugins/telemetry/{}/{entity_id}/values/timeseries",
            entity_type.wire_name()
        ))?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query.query_pairs() {
                pairs.append_pair(key, &value);
            }
        }
        self.get(url).await
    }
}
