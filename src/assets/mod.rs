/// Asset store seam
///
/// Profile images live in an external asset service. The core only forwards
/// local file references produced by the upload handler and keeps the
/// returned `{url, asset_id}`.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::domain::AssetRef;
use crate::error::{AppError, AssetError, ConfigError, ValidationError};

mod http;

pub use http::HttpAssetStore;

#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn upload_asset(&self, path: &Path) -> Result<AssetRef, AssetError>;

    async fn delete_asset(&self, asset_id: &str) -> Result<(), AssetError>;
}

/// Resolve a staged upload reference inside `upload_dir`
///
/// Relative references are taken relative to `upload_dir`. Symlinks and `..`
/// are resolved before the check, so the returned path is always a real
/// entry below the staging directory. Anything else is a validation error and
/// the file is left alone.
pub async fn confine_upload(
    upload_dir: &Path,
    reference: &Path,
    field: &str,
) -> Result<PathBuf, AppError> {
    let root = tokio::fs::canonicalize(upload_dir).await.map_err(|e| {
        tracing::error!(upload_dir = %upload_dir.display(), error = %e, "Upload directory unavailable");
        ConfigError::InvalidValue(format!("assets.upload_dir: {}", e))
    })?;

    let resolved = match tokio::fs::canonicalize(root.join(reference)).await {
        Ok(resolved) => resolved,
        Err(_) => return Err(ValidationError::InvalidFormat(field.to_string()).into()),
    };

    if resolved == root || !resolved.starts_with(&root) {
        tracing::warn!(field, "Upload reference outside the staging directory rejected");
        return Err(ValidationError::InvalidFormat(field.to_string()).into());
    }

    Ok(resolved)
}
