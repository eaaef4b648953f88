#![allow(clippy::unwrap_used)]
// `RestPlatform` against a mocked platform.

use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use netboard_api::PlatformClient;
use netboard_core::{AssetType, Entity, EntityRef, Outcome, Platform, RestPlatform};

const SITE_ID: &str = "1f3a2b5c-0000-4000-8000-000000000011";

async fn setup() -> (MockServer, RestPlatform) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&format!("{}/api", server.uri())).unwrap();
    let client = PlatformClient::with_token(
        reqwest::Client::new(),
        base_url,
        SecretString::from("test-token".to_string()),
    );
    (server, RestPlatform::new(client))
}

#[tokio::test]
async fn relation_with_unknown_child_is_never_posted() {
    let (server, platform) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/tenant/assets"))
        .and(query_param("assetName", "S1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": { "id": SITE_ID, "entityType": "ASSET" },
            "name": "S1",
            "type": "site"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tenant/assets"))
        .and(query_param("assetName", "Z9"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "status": 404,
            "message": "Requested item wasn't found!"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/relation"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = platform
        .create_relation(&EntityRef::asset("S1"), &EntityRef::asset("Z9"))
        .await
        .unwrap_err();

    assert!(err.is_not_found());
}

#[tokio::test]
async fn duplicate_asset_counts_as_existing() {
    let (server, platform) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/asset"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "status": 400,
            "message": "Asset with such name already exists!"
        })))
        .mount(&server)
        .await;

    let outcome = platform
        .create_asset(&Entity::asset("S1", AssetType::Site))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::AlreadyExists);
}

#[tokio::test]
async fn assignment_without_customer_sends_nothing() {
    let (server, platform) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = platform
        .assign_to_customer(&EntityRef::device("AP1"), None)
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Skipped);
}

#[tokio::test]
async fn creating_a_customer_as_an_asset_is_refused() {
    let (_server, platform) = setup().await;

    let err = platform
        .create_asset(&Entity::customer("Acme"))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Acme"));
}
