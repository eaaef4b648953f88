// Platform REST client
//
// Wraps `reqwest::Client` with bearer-token authentication, URL
// construction under the API root, and status/JSON handling. Endpoint
// groups (customers, entities, relations, telemetry) are implemented as
// inherent methods in separate files.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Header carrying the JWT on every authenticated request.
pub(crate) const AUTH_HEADER: &str = "X-Authorization";

/// Raw HTTP client for the platform's REST API.
///
/// `base_url` is the API root including its `/api` suffix, for example
/// `https://iot.example.com/api`. Construct with [`PlatformClient::login`]
/// to authenticate once, or [`PlatformClient::with_token`] when a token is
/// already at hand.
pub struct PlatformClient {
    http: reqwest::Client,
    base_url: Url,
    token: SecretString,
}

impl PlatformClient {
    /// Build an HTTP client from `transport` and authenticate with it.
    pub async fn login(
        base_url: Url,
        username: &str,
        password: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        let token = crate::auth::fetch_token(&http, &base_url, username, password).await?;
        Ok(Self::with_token(http, base_url, token))
    }

    /// Create a client around a pre-built `reqwest::Client` and token.
    pub fn with_token(http: reqwest::Client, base_url: Url, token: SecretString) -> Self {
        Self {
            http,
            base_url,
            token,
        }
    }

    /// The API root URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/{path}` without losing the base's own path segments.
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        join_api(&self.base_url, path)
    }

    // ── Request helpers ──────────────────────────────────────────────

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.header(
            AUTH_HEADER,
            format!("Bearer {}", self.token.expose_secret()),
        )
    }

    /// Send a GET request and deserialize the JSON body.
    pub(crate) async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);

        let resp = self.authorized(self.http.get(url)).send().await?;
        parse_json(check_status(resp).await?).await
    }

    /// Send a POST request with JSON body and deserialize the JSON reply.
    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<T, Error> {
        debug!("POST {}", url);

        let resp = self.authorized(self.http.post(url).json(body)).send().await?;
        parse_json(check_status(resp).await?).await
    }

    /// Send a POST request whose reply body is irrelevant.
    pub(crate) async fn post_no_content(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<(), Error> {
        debug!("POST {}", url);

        let resp = self.authorized(self.http.post(url).json(body)).send().await?;
        check_status(resp).await?;
        Ok(())
    }

    /// Send a body-less POST (assignment endpoints).
    pub(crate) async fn post_empty(&self, url: Url) -> Result<(), Error> {
        debug!("POST {}", url);

        let resp = self.authorized(self.http.post(url)).send().await?;
        check_status(resp).await?;
        Ok(())
    }
}

pub(crate) fn join_api(base: &Url, path: &str) -> Result<Url, Error> {
    let base = base.as_str().trim_end_matches('/');
    let path = path.trim_start_matches('/');
    Ok(Url::parse(&format!("{base}/{path}"))?)
}

/// Map non-success statuses onto [`Error`], keeping a body preview.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = resp.status();

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(Error::Authentication {
            message: "token expired or invalid credentials".into(),
        });
    }

    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Api {
            status: status.as_u16(),
            message: preview(&body).to_owned(),
        });
    }

    Ok(resp)
}

async fn parse_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: format!("{e} (body preview: {:?})", preview(&body)),
        body: body.clone(),
    })
}

fn preview(body: &str) -> &str {
    match body.char_indices().nth(200) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn join_keeps_api_prefix() {
        let base = Url::parse("https://iot.example.com/api/").unwrap();
        let url = join_api(&base, "/tenant/assets").unwrap();
        assert_eq!(url.as_str(), "https://iot.example.com/api/tenant/assets");
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let long = "é".repeat(300);
        assert_eq!(preview(&long).chars().count(), 200);
        assert_eq!(preview("short"), "short");
    }
}
