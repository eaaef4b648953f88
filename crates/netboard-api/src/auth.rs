// Token authentication
//
// `POST {api}/auth/login` with username/password returns a JWT which is
// then sent as `X-Authorization: Bearer <token>` on every request.

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::client::join_api;
use crate::error::Error;
use crate::models::LoginResponse;

pub(crate) async fn fetch_token(
    http: &reqwest::Client,
    base_url: &Url,
    username: &str,
    password: &SecretString,
) -> Result<SecretString, Error> {
    let url = join_api(base_url, "auth/login")?;

    debug!("logging in at {}", url);

    let body = json!({
        "username": username,
        "password": password.expose_secret(),
    });

    let resp = http.post(url).json(&body).send().await?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Authentication {
            message: format!("login failed (HTTP {status}): {body}"),
        });
    }

    let body = resp.text().await?;
    let login: LoginResponse = serde_json::from_str(&body).map_err(|e| Error::Authentication {
        message: format!("login response carried no token: {e}"),
    })?;

    debug!("login successful");
    Ok(SecretString::from(login.token))
}
