use async_trait::async_trait;
use serde_json::{json, Value};
use std::net::TcpListener;
use std::path::Path;
use std::sync::Arc;
use vidtube::assets::AssetStore;
use vidtube::configuration::{get_configuration, Environment};
use vidtube::domain::AssetRef;
use vidtube::error::AssetError;
use vidtube::session::SessionCoordinator;
use vidtube::startup::run;
use vidtube::store::InMemoryCredentialStore;

struct NoAssets;

#[async_trait]
impl AssetStore for NoAssets {
    async fn upload_asset(&self, _path: &Path) -> Result<AssetRef, AssetError> {
        Err(AssetError::UploadFailed("no asset service in tests".to_string()))
    }

    async fn delete_asset(&self, _asset_id: &str) -> Result<(), AssetError> {
        Ok(())
    }
}

/// Every server in this binary runs as production.
async fn spawn_production_app() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let mut configuration = get_configuration().expect("Failed to read configuration.");
    configuration.password.hash_cost = 4;

    let coordinator = SessionCoordinator::new(
        Arc::new(InMemoryCredentialStore::new()),
        Arc::new(NoAssets),
        &configuration,
    );
    let server = run(listener, coordinator, Environment::Production)
        .expect("Failed to bind address");
    let _ = tokio::spawn(server);

    format!("http://127.0.0.1:{}", port)
}

async fn post(address: &str, path: &str, body: &Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(&format!("{}/api/v1/users/{}", address, path))
        .json(body)
        .send()
        .await
        .expect("Failed to execute request.")
}

#[tokio::test]
async fn error_envelope_has_no_stack_in_production() {
    let address = spawn_production_app().await;
    let body = json!({"username": "ana", "email": "a@x.com", "password": "p1"});
    post(&address, "register", &body).await;

    let response = post(&address, "register", &body).await;

    assert_eq!(409, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body.get("stack").is_none());
}

#[tokio::test]
async fn session_cookies_are_secure_in_production() {
    let address = spawn_production_app().await;
    post(
        &address,
        "register",
        &json!({"username": "ana", "email": "a@x.com", "password": "p1"}),
    )
    .await;

    let response = post(&address, "login", &json!({"username": "ana", "password": "p1"})).await;

    assert_eq!(200, response.status().as_u16());
    let secure = response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter(|v| v.to_str().unwrap().contains("Secure"))
        .count();
    assert_eq!(2, secure);
}
