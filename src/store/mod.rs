/// Credential Store
///
/// Persistence seam for identity records. Every mutation of a single identity
/// is one atomic operation in the backend; callers never read-modify-write the
/// session slot across two round trips.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{AssetRef, IdentityRecord, ImageSlot};
use crate::error::DatabaseError;

mod memory;
mod postgres;

pub use memory::InMemoryCredentialStore;
pub use postgres::PgCredentialStore;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Persist a new identity. Duplicate username or email is
    /// `DatabaseError::UniqueConstraintViolation`.
    async fn insert(&self, record: &IdentityRecord) -> Result<(), DatabaseError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<IdentityRecord>, DatabaseError>;

    /// Look an identity up by username OR email (both stored normalised).
    async fn find_by_username_or_email(
        &self,
        identifier: &str,
    ) -> Result<Option<IdentityRecord>, DatabaseError>;

    /// Whether any identity already holds `username` or `email`.
    async fn exists_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<bool, DatabaseError>;

    /// Overwrite (or clear) the refresh-token slot unconditionally.
    async fn set_refresh_token(
        &self,
        id: Uuid,
        token_hash: Option<&str>,
    ) -> Result<(), DatabaseError>;

    /// Replace the refresh-token slot only if it still holds `expected`.
    /// Returns `false` when the slot held something else.
    async fn rotate_refresh_token(
        &self,
        id: Uuid,
        expected: &str,
        replacement: &str,
    ) -> Result<bool, DatabaseError>;

    /// Store a new password hash, optionally clearing the session slot in the
    /// same write. Returns `false` if the identity does not exist.
    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        clear_refresh_token: bool,
    ) -> Result<bool, DatabaseError>;

    async fn update_account(
        &self,
        id: Uuid,
        full_name: &str,
        email: &str,
    ) -> Result<Option<IdentityRecord>, DatabaseError>;

    async fn update_image(
        &self,
        id: Uuid,
        slot: ImageSlot,
        asset: &AssetRef,
    ) -> Result<Option<IdentityRecord>, DatabaseError>;
}
