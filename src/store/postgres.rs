use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::CredentialStore;
use crate::domain::{AssetRef, IdentityRecord, ImageSlot};
use crate::error::DatabaseError;

const USER_COLUMNS: &str = "id, username, email, full_name, password_hash, refresh_token_hash, \
     avatar_url, avatar_asset_id, cover_image_url, cover_image_asset_id, created_at, updated_at";

/// Credential store over the `users` table
///
/// UNIQUE constraints on `username` and `email` are the authoritative
/// duplicate check; each mutation is a single `UPDATE`.
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    full_name: String,
    password_hash: String,
    refresh_token_hash: Option<String>,
    avatar_url: Option<String>,
    avatar_asset_id: Option<String>,
    cover_image_url: Option<String>,
    cover_image_asset_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn asset(url: Option<String>, asset_id: Option<String>) -> Option<AssetRef> {
    match (url, asset_id) {
        (Some(url), Some(asset_id)) => Some(AssetRef { url, asset_id }),
        _ => None,
    }
}

impl From<UserRow> for IdentityRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            full_name: row.full_name,
            password_hash: row.password_hash,
            refresh_token_hash: row.refresh_token_hash,
            avatar: asset(row.avatar_url, row.avatar_asset_id),
            cover_image: asset(row.cover_image_url, row.cover_image_asset_id),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn image_columns(slot: ImageSlot) -> (&'static str, &'static str) {
    match slot {
        ImageSlot::Avatar => ("avatar_url", "avatar_asset_id"),
        ImageSlot::CoverImage => ("cover_image_url", "cover_image_asset_id"),
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn insert(&self, record: &IdentityRecord) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, full_name, password_hash, refresh_token_hash,
                avatar_url, avatar_asset_id, cover_image_url, cover_image_asset_id,
                created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(record.id)
        .bind(&record.username)
        .bind(&record.email)
        .bind(&record.full_name)
        .bind(&record.password_hash)
        .bind(&record.refresh_token_hash)
        .bind(record.avatar.as_ref().map(|a| a.url.clone()))
        .bind(record.avatar.as_ref().map(|a| a.asset_id.clone()))
        .bind(record.cover_image.as_ref().map(|a| a.url.clone()))
        .bind(record.cover_image.as_ref().map(|a| a.asset_id.clone()))
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<IdentityRecord>, DatabaseError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(IdentityRecord::from))
    }

    async fn find_by_username_or_email(
        &self,
        identifier: &str,
    ) -> Result<Option<IdentityRecord>, DatabaseError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE username = $1 OR email = $1",
            USER_COLUMNS
        ))
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(IdentityRecord::from))
    }

    async fn exists_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<bool, DatabaseError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 OR email = $2)",
        )
        .bind(username)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn set_refresh_token(
        &self,
        id: Uuid,
        token_hash: Option<&str>,
    ) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE users SET refresh_token_hash = $1, updated_at = $2 WHERE id = $3")
            .bind(token_hash)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        id: Uuid,
        expected: &str,
        replacement: &str,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET refresh_token_hash = $1, updated_at = $2
            WHERE id = $3 AND refresh_token_hash = $4
            "#,
        )
        .bind(replacement)
        .bind(Utc::now())
        .bind(id)
        .bind(expected)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        clear_refresh_token: bool,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $1,
                refresh_token_hash = CASE WHEN $2 THEN NULL ELSE refresh_token_hash END,
                updated_at = $3
            WHERE id = $4
            "#,
        )
        .bind(password_hash)
        .bind(clear_refresh_token)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn update_account(
        &self,
        id: Uuid,
        full_name: &str,
        email: &str,
    ) -> Result<Option<IdentityRecord>, DatabaseError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET full_name = $1, email = $2, updated_at = $3 WHERE id = $4 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(full_name)
        .bind(email)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(IdentityRecord::from))
    }

    async fn update_image(
        &self,
        id: Uuid,
        slot: ImageSlot,
        asset: &AssetRef,
    ) -> Result<Option<IdentityRecord>, DatabaseError> {
        let (url_column, asset_column) = image_columns(slot);
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET {} = $1, {} = $2, updated_at = $3 WHERE id = $4 RETURNING {}",
            url_column, asset_column, USER_COLUMNS
        ))
        .bind(&asset.url)
        .bind(&asset.asset_id)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(IdentityRecord::from))
    }
}
