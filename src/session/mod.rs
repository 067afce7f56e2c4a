/// Session Coordinator
///
/// Owns every state transition of an identity's session slot:
///
/// ```text
/// NoSession --login--> ActiveSession[T] --refresh--> ActiveSession[T']
///     ^                      |
///     +-------logout---------+
/// ```
///
/// A refresh token is usable iff it verifies cryptographically and its digest
/// equals the stored slot. Login and refresh overwrite the slot, logout
/// clears it, so at most one refresh token per identity is ever live.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::assets::{confine_upload, AssetStore};
use crate::auth::{
    hash_token, validate_password, PasswordHasher, TokenClaims, TokenIssuer, TokenPair,
    TokenVerifier,
};
use crate::configuration::Settings;
use crate::domain::{AssetRef, IdentityRecord, ImageSlot, NewIdentity, PublicIdentity};
use crate::error::{AppError, AuthError, DatabaseError};
use crate::store::CredentialStore;
use crate::validators::{is_valid_email, is_valid_name, is_valid_username, normalize_identifier};

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub identity: PublicIdentity,
    pub tokens: TokenPair,
}

pub struct SessionCoordinator {
    store: Arc<dyn CredentialStore>,
    assets: Arc<dyn AssetStore>,
    hasher: PasswordHasher,
    issuer: TokenIssuer,
    verifier: TokenVerifier,
    store_timeout: Duration,
    revoke_on_password_change: bool,
    upload_dir: PathBuf,
}

impl SessionCoordinator {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        assets: Arc<dyn AssetStore>,
        settings: &Settings,
    ) -> Self {
        Self {
            store,
            assets,
            hasher: PasswordHasher::new(settings.password.hash_cost),
            issuer: TokenIssuer::new(&settings.tokens),
            verifier: TokenVerifier::new(&settings.tokens),
            store_timeout: settings.store.timeout(),
            revoke_on_password_change: settings.session.revoke_on_password_change,
            upload_dir: settings.assets.upload_dir.clone(),
        }
    }

    /// Register a new identity
    ///
    /// The uniqueness pre-check is advisory; a constraint violation from the
    /// store is reported as the same `Conflict`. Assets uploaded before a
    /// failed insert are deleted again. Image references must resolve inside
    /// `assets.upload_dir`.
    pub async fn register(&self, new: NewIdentity) -> Result<PublicIdentity, AppError> {
        let username = is_valid_username(&new.username)?;
        let email = is_valid_email(&new.email)?;
        validate_password(&new.password, "password")?;
        let full_name = match new.full_name.as_deref() {
            Some(name) if !name.trim().is_empty() => is_valid_name(name)?,
            _ => String::new(),
        };
        let avatar_path = self.staged(new.avatar_path.as_deref(), ImageSlot::Avatar).await?;
        let cover_image_path = self
            .staged(new.cover_image_path.as_deref(), ImageSlot::CoverImage)
            .await?;

        let taken = self
            .bounded("exists_username_or_email", self.store.exists_username_or_email(&username, &email))
            .await?;
        if taken {
            return Err(AppError::Conflict(
                "User with email or username already exists".to_string(),
            ));
        }

        let password_hash = self.set_password(&new.password).await?;

        let avatar = self.upload_optional(avatar_path.as_deref()).await?;
        let cover_image = match self.upload_optional(cover_image_path.as_deref()).await {
            Ok(cover_image) => cover_image,
            Err(e) => {
                self.discard_assets(avatar.iter()).await;
                return Err(e);
            }
        };

        let now = Utc::now();
        let record = IdentityRecord {
            id: Uuid::new_v4(),
            username,
            email,
            full_name,
            password_hash,
            refresh_token_hash: None,
            avatar,
            cover_image,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.bounded("insert", self.store.insert(&record)).await {
            tracing::warn!(error = %e, "Identity creation failed");
            self.discard_assets(record.avatar.iter().chain(record.cover_image.iter()))
                .await;
            return Err(e);
        }

        tracing::info!(user_id = %record.id, "User registered successfully");
        Ok(record.into())
    }

    /// Authenticate by username or email and open a fresh session
    ///
    /// Overwrites the session slot unconditionally, which revokes any refresh
    /// token issued by an earlier login.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<LoginOutcome, AppError> {
        let identifier = normalize_identifier(identifier)?;
        validate_password(password, "password")?;

        let record = self
            .bounded("find_by_username_or_email", self.store.find_by_username_or_email(&identifier))
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if !self.check_password(password, &record.password_hash).await? {
            return Err(AuthError::InvalidCredentials.into());
        }

        let tokens = self.issuer.issue_pair(&record)?;
        let digest = hash_token(&tokens.refresh_token);
        self.bounded("set_refresh_token", self.store.set_refresh_token(record.id, Some(&digest)))
            .await?;

        tracing::info!(user_id = %record.id, "User logged in successfully");
        Ok(LoginOutcome {
            identity: record.into(),
            tokens,
        })
    }

    /// Clear the session slot. Idempotent.
    pub async fn logout(&self, identity_id: Uuid) -> Result<(), AppError> {
        self.bounded("set_refresh_token", self.store.set_refresh_token(identity_id, None))
            .await?;

        tracing::info!(user_id = %identity_id, "User logged out");
        Ok(())
    }

    /// Rotate a refresh token into a new token pair
    ///
    /// The presented token becomes unusable even before it expires. Every
    /// failure is the same `InvalidToken`.
    pub async fn refresh(&self, presented: &str) -> Result<TokenPair, AppError> {
        let claims = self.verifier.verify_refresh(presented)?;
        let user_id = claims.user_id()?;

        let record = self
            .bounded("find_by_id", self.store.find_by_id(user_id))
            .await?
            .ok_or_else(|| {
                tracing::warn!(user_id = %user_id, "Refresh token for unknown identity");
                AuthError::InvalidToken
            })?;

        let presented_digest = hash_token(presented);
        if record.refresh_token_hash.as_deref() != Some(presented_digest.as_str()) {
            tracing::warn!(user_id = %user_id, "Attempt to use revoked refresh token");
            return Err(AuthError::InvalidToken.into());
        }

        let tokens = self.issuer.issue_pair(&record)?;
        let rotated = self
            .bounded(
                "rotate_refresh_token",
                self.store.rotate_refresh_token(
                    user_id,
                    &presented_digest,
                    &hash_token(&tokens.refresh_token),
                ),
            )
            .await?;

        if !rotated {
            // A concurrent login, logout or refresh won the slot.
            tracing::warn!(user_id = %user_id, "Refresh token replaced concurrently");
            return Err(AuthError::InvalidToken.into());
        }

        tracing::info!(user_id = %user_id, "Token refreshed successfully");
        Ok(tokens)
    }

    /// Replace the password after checking the current one
    ///
    /// Open sessions survive unless `session.revoke_on_password_change` is set.
    pub async fn change_password(
        &self,
        identity_id: Uuid,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        validate_password(old_password, "oldPassword")?;
        validate_password(new_password, "newPassword")?;

        let record = self.load(identity_id).await?;
        if !self.check_password(old_password, &record.password_hash).await? {
            return Err(AuthError::InvalidCredentials.into());
        }

        let password_hash = self.set_password(new_password).await?;
        let updated = self
            .bounded(
                "update_password",
                self.store.update_password(
                    identity_id,
                    &password_hash,
                    self.revoke_on_password_change,
                ),
            )
            .await?;
        if !updated {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        tracing::info!(
            user_id = %identity_id,
            sessions_revoked = self.revoke_on_password_change,
            "Password changed"
        );
        Ok(())
    }

    /// Resolve an access token to the identity it names
    ///
    /// Used by the request authorization gate. A token for an identity that
    /// no longer exists is rejected like any other bad token.
    pub async fn authenticate(&self, access_token: &str) -> Result<PublicIdentity, AppError> {
        let claims = self.verifier.verify_access(access_token)?;
        let user_id = claims.user_id()?;

        let record = self
            .bounded("find_by_id", self.store.find_by_id(user_id))
            .await?
            .ok_or_else(|| {
                tracing::warn!(user_id = %user_id, "Access token for unknown identity");
                AuthError::InvalidToken
            })?;

        Ok(record.into())
    }

    pub async fn current_identity(&self, identity_id: Uuid) -> Result<PublicIdentity, AppError> {
        Ok(self.load(identity_id).await?.into())
    }

    pub async fn update_account(
        &self,
        identity_id: Uuid,
        full_name: &str,
        email: &str,
    ) -> Result<PublicIdentity, AppError> {
        let full_name = is_valid_name(full_name)?;
        let email = is_valid_email(email)?;

        let record = self
            .bounded("update_account", self.store.update_account(identity_id, &full_name, &email))
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        tracing::info!(user_id = %identity_id, "Account details updated");
        Ok(record.into())
    }

    pub async fn update_avatar(
        &self,
        identity_id: Uuid,
        path: &Path,
    ) -> Result<PublicIdentity, AppError> {
        self.replace_image(identity_id, ImageSlot::Avatar, path).await
    }

    pub async fn update_cover_image(
        &self,
        identity_id: Uuid,
        path: &Path,
    ) -> Result<PublicIdentity, AppError> {
        self.replace_image(identity_id, ImageSlot::CoverImage, path).await
    }

    async fn replace_image(
        &self,
        identity_id: Uuid,
        slot: ImageSlot,
        path: &Path,
    ) -> Result<PublicIdentity, AppError> {
        let path = confine_upload(&self.upload_dir, path, slot.field_name()).await?;
        let previous = self.load(identity_id).await?.image(slot).cloned();
        let uploaded = self.assets.upload_asset(&path).await?;

        let updated = match self
            .bounded("update_image", self.store.update_image(identity_id, slot, &uploaded))
            .await
        {
            Ok(Some(record)) => record,
            Ok(None) => {
                self.discard_assets(std::iter::once(&uploaded)).await;
                return Err(AppError::NotFound("User not found".to_string()));
            }
            Err(e) => {
                self.discard_assets(std::iter::once(&uploaded)).await;
                return Err(e);
            }
        };

        if let Some(previous) = previous {
            self.discard_assets(std::iter::once(&previous)).await;
        }

        tracing::info!(user_id = %identity_id, field = slot.field_name(), "Profile image updated");
        Ok(updated.into())
    }

    async fn load(&self, identity_id: Uuid) -> Result<IdentityRecord, AppError> {
        self.bounded("find_by_id", self.store.find_by_id(identity_id))
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Derive the hash for a password being set. Only register and
    /// change_password call this.
    async fn set_password(&self, plaintext: &str) -> Result<String, AppError> {
        let hasher = self.hasher;
        let plaintext = plaintext.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
    }

    async fn check_password(&self, plaintext: &str, password_hash: &str) -> Result<bool, AppError> {
        let hasher = self.hasher;
        let plaintext = plaintext.to_string();
        let password_hash = password_hash.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &password_hash))
            .await
            .map_err(|e| AppError::Internal(format!("Password verification task failed: {}", e)))?
    }

    /// Run a store call under the configured deadline.
    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, DatabaseError>>,
    {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => result.map_err(AppError::from),
            Err(_) => {
                tracing::warn!(operation, "Credential store call timed out");
                Err(DatabaseError::Timeout(operation.to_string()).into())
            }
        }
    }

    async fn staged(
        &self,
        reference: Option<&Path>,
        slot: ImageSlot,
    ) -> Result<Option<PathBuf>, AppError> {
        match reference {
            Some(reference) => Ok(Some(
                confine_upload(&self.upload_dir, reference, slot.field_name()).await?,
            )),
            None => Ok(None),
        }
    }

    async fn upload_optional(&self, path: Option<&Path>) -> Result<Option<AssetRef>, AppError> {
        match path {
            Some(path) => Ok(Some(self.assets.upload_asset(path).await?)),
            None => Ok(None),
        }
    }

    /// Best-effort compensation: failures are logged, never returned, so the
    /// caller's original error stays the one reported.
    async fn discard_assets<'a>(&self, assets: impl Iterator<Item = &'a AssetRef>) {
        for asset in assets {
            if let Err(e) = self.assets.delete_asset(&asset.asset_id).await {
                tracing::error!(asset_id = %asset.asset_id, error = %e, "Failed to delete orphaned asset");
            }
        }
    }
}
