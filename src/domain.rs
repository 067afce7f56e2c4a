/// Identity records and their public projection

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

/// A file held by the external asset service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRef {
    pub url: String,
    pub asset_id: String,
}

/// Which profile image slot an asset occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSlot {
    Avatar,
    CoverImage,
}

impl ImageSlot {
    pub fn field_name(&self) -> &'static str {
        match self {
            ImageSlot::Avatar => "avatar",
            ImageSlot::CoverImage => "coverImage",
        }
    }
}

/// Persisted account entity
///
/// `refresh_token_hash` is the single session slot: the SHA-256 digest of the
/// one refresh token currently allowed to rotate, or `None` when logged out.
#[derive(Debug, Clone)]
pub struct IdentityRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub refresh_token_hash: Option<String>,
    pub avatar: Option<AssetRef>,
    pub cover_image: Option<AssetRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IdentityRecord {
    pub fn image(&self, slot: ImageSlot) -> Option<&AssetRef> {
        match slot {
            ImageSlot::Avatar => self.avatar.as_ref(),
            ImageSlot::CoverImage => self.cover_image.as_ref(),
        }
    }
}

/// Identity as exposed to clients and downstream handlers: no password hash,
/// no refresh-token slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIdentity {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<IdentityRecord> for PublicIdentity {
    fn from(record: IdentityRecord) -> Self {
        Self {
            id: record.id,
            username: record.username,
            email: record.email,
            full_name: record.full_name,
            avatar: record.avatar.map(|a| a.url),
            cover_image: record.cover_image.map(|a| a.url),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Registration input as handed over by the upload-aware HTTP layer.
#[derive(Debug, Clone, Default)]
pub struct NewIdentity {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub avatar_path: Option<PathBuf>,
    pub cover_image_path: Option<PathBuf>,
}
