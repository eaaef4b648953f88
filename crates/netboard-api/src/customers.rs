// Customer endpoints

use serde_json::json;
use tracing::debug;

use crate::client::PlatformClient;
use crate::error::Error;
use crate::models::PlatformEntity;

impl PlatformClient {
    /// Create a customer.
    ///
    /// `POST /customer` with `{"title": "..."}`
    pub async fn create_customer(&self, title: &str) -> Result<PlatformEntity, Error> {
        let url = self.api_url("customer")?;
        debug!(title, "creating customer");
        self.post(url, &json!({ "title": title })).await
    }

    /// Look a customer up by its title.
    ///
    /// `GET /tenant/customers?customerTitle=...`
    pub async fn customer_by_title(&self, title: &str) -> Result<PlatformEntity, Error> {
        let mut url = self.api_url("tenant/customers")?;
        url.query_pairs_mut().append_pair("customerTitle", title);
        self.get(url).await
    }
}
