use async_trait::async_trait;
use serde_json::{json, Value};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use vidtube::assets::AssetStore;
use vidtube::configuration::{get_configuration, StoreBackend};
use vidtube::domain::AssetRef;
use vidtube::error::AssetError;
use vidtube::session::SessionCoordinator;
use vidtube::startup::run;
use vidtube::store::InMemoryCredentialStore;

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub upload_dir: PathBuf,
}

/// Hands out sequential asset ids without touching the filesystem.
#[derive(Default)]
struct StubAssets {
    uploads: AtomicUsize,
}

#[async_trait]
impl AssetStore for StubAssets {
    async fn upload_asset(&self, _path: &Path) -> Result<AssetRef, AssetError> {
        let n = self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(AssetRef {
            url: format!("https://assets.test/{}", n),
            asset_id: format!("asset-{}", n),
        })
    }

    async fn delete_asset(&self, _asset_id: &str) -> Result<(), AssetError> {
        Ok(())
    }
}

async fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let mut configuration = get_configuration().expect("Failed to read configuration.");
    configuration.store.backend = StoreBackend::Memory;
    configuration.password.hash_cost = 4;
    configuration.assets.upload_dir =
        std::env::temp_dir().join(format!("vidtube-uploads-{}", uuid::Uuid::new_v4()));
    tokio::fs::create_dir_all(&configuration.assets.upload_dir)
        .await
        .expect("Failed to create upload directory");

    let coordinator = SessionCoordinator::new(
        Arc::new(InMemoryCredentialStore::new()),
        Arc::new(StubAssets::default()),
        &configuration,
    );
    let server = run(listener, coordinator, configuration.application.environment)
        .expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        client: reqwest::Client::new(),
        upload_dir: configuration.assets.upload_dir,
    }
}

impl TestApp {
    /// Place a file where the upload handler would have written it.
    async fn stage(&self, name: &str) -> PathBuf {
        let path = self.upload_dir.join(name);
        tokio::fs::write(&path, b"image").await.unwrap();
        path
    }

    async fn post(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(&format!("{}/api/v1/users/{}", &self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn register_ana(&self) -> reqwest::Response {
        self.post(
            "register",
            &json!({"username": "ana", "email": "a@x.com", "password": "p1"}),
        )
        .await
    }

    /// Log in as ana and return the `data` object.
    async fn login_ana(&self) -> Value {
        let response = self
            .post("login", &json!({"username": "ana", "password": "p1"}))
            .await;
        assert_eq!(200, response.status().as_u16());
        let body: Value = response.json().await.expect("Failed to parse response");
        body["data"].clone()
    }
}

fn token(data: &Value, key: &str) -> String {
    data[key].as_str().expect("token missing").to_string()
}

// --- Health ---

#[tokio::test]
async fn healthcheck_returns_ok_envelope() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(&format!("{}/api/v1/healthcheck", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["statusCode"], 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"], "OK");
}

// --- Registration ---

#[tokio::test]
async fn register_returns_201_without_credentials_in_body() {
    let app = spawn_app().await;

    let response = app.register_ana().await;

    assert_eq!(201, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["username"], "ana");
    assert_eq!(body["data"]["email"], "a@x.com");
    assert!(body["data"].get("passwordHash").is_none());
    assert!(body["data"].get("refreshTokenHash").is_none());
}

#[tokio::test]
async fn register_twice_returns_409() {
    let app = spawn_app().await;
    app.register_ana().await;

    let response = app.register_ana().await;

    assert_eq!(409, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["statusCode"], 409);
    assert!(body["data"].is_null());
    assert!(body["errors"].is_array());
    assert!(body["stack"].is_string());
}

#[tokio::test]
async fn register_with_file_outside_upload_dir_returns_400() {
    let app = spawn_app().await;
    let outside = std::env::temp_dir().join(format!("victim-{}.conf", uuid::Uuid::new_v4()));
    std::fs::write(&outside, b"secret").unwrap();

    let response = app
        .post(
            "register",
            &json!({
                "username": "ana",
                "email": "a@x.com",
                "password": "p1",
                "avatarPath": outside,
            }),
        )
        .await;

    assert_eq!(400, response.status().as_u16());
    assert!(outside.exists());
    assert_eq!(std::fs::read(&outside).unwrap(), b"secret");
}

#[tokio::test]
async fn register_with_blank_field_returns_400() {
    let app = spawn_app().await;

    let response = app
        .post(
            "register",
            &json!({"username": "  ", "email": "a@x.com", "password": "p1"}),
        )
        .await;

    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn register_with_unsafe_username_characters_returns_400() {
    let app = spawn_app().await;

    for username in ["two words", "slash/name"] {
        let response = app
            .post(
                "register",
                &json!({"username": username, "email": "a@x.com", "password": "p1"}),
            )
            .await;
        assert_eq!(400, response.status().as_u16());
    }
}

#[tokio::test]
async fn malformed_json_returns_400_envelope() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(&format!("{}/api/v1/users/register", &app.address))
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
}

// --- Login ---

#[tokio::test]
async fn login_sets_http_only_session_cookies() {
    let app = spawn_app().await;
    app.register_ana().await;

    let response = app
        .post("login", &json!({"email": "a@x.com", "password": "p1"}))
        .await;

    assert_eq!(200, response.status().as_u16());
    let cookies: Vec<String> = response
        .headers()
        .get_all("set-cookie")
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert!(cookies.iter().any(|c| c.starts_with("accessToken=") && c.contains("HttpOnly")));
    assert!(cookies.iter().any(|c| c.starts_with("refreshToken=") && c.contains("HttpOnly")));

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["user"]["username"], "ana");
    assert!(body["data"]["accessToken"].is_string());
    assert!(body["data"]["refreshToken"].is_string());
}

#[tokio::test]
async fn login_with_wrong_password_returns_401() {
    let app = spawn_app().await;
    app.register_ana().await;

    let response = app
        .post("login", &json!({"username": "ana", "password": "wrong"}))
        .await;

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn login_for_unknown_user_returns_404() {
    let app = spawn_app().await;

    let response = app
        .post("login", &json!({"username": "nobody", "password": "p1"}))
        .await;

    assert_eq!(404, response.status().as_u16());
}

// --- Refresh ---

#[tokio::test]
async fn refresh_token_is_single_use() {
    let app = spawn_app().await;
    app.register_ana().await;
    let first = app.login_ana().await;
    let presented = token(&first, "refreshToken");

    let response = app
        .post("refresh-token", &json!({"refreshToken": presented}))
        .await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    let rotated = token(&body["data"], "refreshToken");
    assert_ne!(rotated, presented);

    let replay = app
        .post("refresh-token", &json!({"refreshToken": presented}))
        .await;
    assert_eq!(401, replay.status().as_u16());

    let next = app
        .post("refresh-token", &json!({"refreshToken": rotated}))
        .await;
    assert_eq!(200, next.status().as_u16());
}

#[tokio::test]
async fn refresh_prefers_cookie_over_body() {
    let app = spawn_app().await;
    app.register_ana().await;
    let data = app.login_ana().await;

    let response = app
        .client
        .post(&format!("{}/api/v1/users/refresh-token", &app.address))
        .header("Cookie", format!("refreshToken={}", token(&data, "refreshToken")))
        .json(&json!({"refreshToken": "garbage"}))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn refresh_without_token_returns_401() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(&format!("{}/api/v1/users/refresh-token", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn refresh_rejects_access_token() {
    let app = spawn_app().await;
    app.register_ana().await;
    let data = app.login_ana().await;

    let response = app
        .post("refresh-token", &json!({"refreshToken": token(&data, "accessToken")}))
        .await;

    assert_eq!(401, response.status().as_u16());
}

// --- Protected routes ---

#[tokio::test]
async fn protected_route_without_token_returns_401() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(&format!("{}/api/v1/users/current-user", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn current_user_accepts_bearer_token() {
    let app = spawn_app().await;
    app.register_ana().await;
    let data = app.login_ana().await;

    let response = app
        .client
        .get(&format!("{}/api/v1/users/current-user", &app.address))
        .bearer_auth(token(&data, "accessToken"))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["username"], "ana");
}

#[tokio::test]
async fn current_user_rejects_refresh_token_as_bearer() {
    let app = spawn_app().await;
    app.register_ana().await;
    let data = app.login_ana().await;

    let response = app
        .client
        .get(&format!("{}/api/v1/users/current-user", &app.address))
        .bearer_auth(token(&data, "refreshToken"))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn logout_revokes_refresh_token_and_clears_cookies() {
    let app = spawn_app().await;
    app.register_ana().await;
    let data = app.login_ana().await;

    let response = app
        .client
        .post(&format!("{}/api/v1/users/logout", &app.address))
        .header("Cookie", format!("accessToken={}", token(&data, "accessToken")))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    let cleared = response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter(|v| v.to_str().unwrap().contains("Max-Age=0"))
        .count();
    assert_eq!(2, cleared);

    let refresh = app
        .post("refresh-token", &json!({"refreshToken": token(&data, "refreshToken")}))
        .await;
    assert_eq!(401, refresh.status().as_u16());
}

#[tokio::test]
async fn change_password_requires_old_password() {
    let app = spawn_app().await;
    app.register_ana().await;
    let data = app.login_ana().await;
    let access = token(&data, "accessToken");

    let wrong = app
        .client
        .post(&format!("{}/api/v1/users/change-password", &app.address))
        .bearer_auth(&access)
        .json(&json!({"oldPassword": "nope", "newPassword": "p2"}))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, wrong.status().as_u16());

    let changed = app
        .client
        .post(&format!("{}/api/v1/users/change-password", &app.address))
        .bearer_auth(&access)
        .json(&json!({"oldPassword": "p1", "newPassword": "p2"}))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, changed.status().as_u16());

    let old = app
        .post("login", &json!({"username": "ana", "password": "p1"}))
        .await;
    assert_eq!(401, old.status().as_u16());
    let new = app
        .post("login", &json!({"username": "ana", "password": "p2"}))
        .await;
    assert_eq!(200, new.status().as_u16());
}

#[tokio::test]
async fn update_account_and_avatar() {
    let app = spawn_app().await;
    app.register_ana().await;
    let data = app.login_ana().await;
    let access = token(&data, "accessToken");

    let response = app
        .client
        .patch(&format!("{}/api/v1/users/update-account", &app.address))
        .bearer_auth(&access)
        .json(&json!({"fullName": "Ana Lima", "email": "ana@x.com"}))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["fullName"], "Ana Lima");
    assert_eq!(body["data"]["email"], "ana@x.com");

    let response = app
        .client
        .patch(&format!("{}/api/v1/users/avatar", &app.address))
        .bearer_auth(&access)
        .json(&json!({"avatarPath": app.stage("upload-ana.png").await}))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert!(body["data"]["avatar"]
        .as_str()
        .unwrap()
        .starts_with("https://assets.test/"));
}
