use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use super::AssetStore;
use crate::configuration::AssetSettings;
use crate::domain::AssetRef;
use crate::error::AssetError;

/// HTTP client for the asset service
///
/// `POST {base_url}/assets` (multipart, field `file`) and
/// `DELETE {base_url}/assets/{asset_id}`, both with a bearer API key.
#[derive(Clone)]
pub struct HttpAssetStore {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    url: String,
    asset_id: String,
}

impl HttpAssetStore {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self, AssetError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AssetError::ConfigurationError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn from_settings(settings: &AssetSettings) -> Result<Self, AssetError> {
        Self::new(
            settings.base_url.clone(),
            settings.api_key.clone(),
            Duration::from_millis(settings.timeout_millis),
        )
    }

    fn asset_url(&self, asset_id: &str) -> String {
        format!("{}/assets/{}", self.base_url, asset_id)
    }

    async fn send_upload(&self, path: &Path) -> Result<AssetRef, AssetError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AssetError::LocalFile(format!("{}: {}", path.display(), e)))?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload")
            .to_string();

        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name));

        let response = self
            .http_client
            .post(format!("{}/assets", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to reach asset service: {}", e);
                AssetError::UploadFailed(e.to_string())
            })?
            .error_for_status()
            .map_err(|e| {
                tracing::error!("Asset service rejected upload: {}", e);
                AssetError::UploadFailed(e.to_string())
            })?;

        let uploaded = response
            .json::<UploadResponse>()
            .await
            .map_err(|e| AssetError::UploadFailed(format!("unexpected response: {}", e)))?;

        tracing::info!(asset_id = %uploaded.asset_id, "Asset uploaded");
        Ok(AssetRef {
            url: uploaded.url,
            asset_id: uploaded.asset_id,
        })
    }
}

#[async_trait]
impl AssetStore for HttpAssetStore {
    /// Upload a local file; the local copy is removed whether or not the
    /// upload succeeded.
    async fn upload_asset(&self, path: &Path) -> Result<AssetRef, AssetError> {
        let result = self.send_upload(path).await;

        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove local upload");
        }

        result
    }

    async fn delete_asset(&self, asset_id: &str) -> Result<(), AssetError> {
        self.http_client
            .delete(self.asset_url(asset_id))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| AssetError::DeleteFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| AssetError::DeleteFailed(e.to_string()))?;

        tracing::info!(asset_id = %asset_id, "Asset deleted");
        Ok(())
    }
}
