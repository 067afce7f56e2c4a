use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use super::CredentialStore;
use crate::domain::{AssetRef, IdentityRecord, ImageSlot};
use crate::error::DatabaseError;

/// Process-local credential store
///
/// A single lock guards the map, so uniqueness checks and slot updates are
/// atomic exactly like their SQL counterparts.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    records: RwLock<HashMap<Uuid, IdentityRecord>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

fn duplicate(field: &str) -> DatabaseError {
    DatabaseError::UniqueConstraintViolation(format!("{} already taken", field))
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn insert(&self, record: &IdentityRecord) -> Result<(), DatabaseError> {
        let mut records = self.records.write();
        for existing in records.values() {
            if existing.username == record.username {
                return Err(duplicate("username"));
            }
            if existing.email == record.email {
                return Err(duplicate("email"));
            }
        }
        if records.contains_key(&record.id) {
            return Err(duplicate("id"));
        }
        records.insert(record.id, record.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<IdentityRecord>, DatabaseError> {
        Ok(self.records.read().get(&id).cloned())
    }

    async fn find_by_username_or_email(
        &self,
        identifier: &str,
    ) -> Result<Option<IdentityRecord>, DatabaseError> {
        Ok(self
            .records
            .read()
            .values()
            .find(|r| r.username == identifier || r.email == identifier)
            .cloned())
    }

    async fn exists_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<bool, DatabaseError> {
        Ok(self
            .records
            .read()
            .values()
            .any(|r| r.username == username || r.email == email))
    }

    async fn set_refresh_token(
        &self,
        id: Uuid,
        token_hash: Option<&str>,
    ) -> Result<(), DatabaseError> {
        if let Some(record) = self.records.write().get_mut(&id) {
            record.refresh_token_hash = token_hash.map(str::to_string);
            record.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        id: Uuid,
        expected: &str,
        replacement: &str,
    ) -> Result<bool, DatabaseError> {
        let mut records = self.records.write();
        match records.get_mut(&id) {
            Some(record) if record.refresh_token_hash.as_deref() == Some(expected) => {
                record.refresh_token_hash = Some(replacement.to_string());
                record.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        clear_refresh_token: bool,
    ) -> Result<bool, DatabaseError> {
        let mut records = self.records.write();
        match records.get_mut(&id) {
            Some(record) => {
                record.password_hash = password_hash.to_string();
                if clear_refresh_token {
                    record.refresh_token_hash = None;
                }
                record.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_account(
        &self,
        id: Uuid,
        full_name: &str,
        email: &str,
    ) -> Result<Option<IdentityRecord>, DatabaseError> {
        let mut records = self.records.write();
        if records.values().any(|r| r.id != id && r.email == email) {
            return Err(duplicate("email"));
        }
        Ok(records.get_mut(&id).map(|record| {
            record.full_name = full_name.to_string();
            record.email = email.to_string();
            record.updated_at = Utc::now();
            record.clone()
        }))
    }

    async fn update_image(
        &self,
        id: Uuid,
        slot: ImageSlot,
        asset: &AssetRef,
    ) -> Result<Option<IdentityRecord>, DatabaseError> {
        Ok(self.records.write().get_mut(&id).map(|record| {
            match slot {
                ImageSlot::Avatar => record.avatar = Some(asset.clone()),
                ImageSlot::CoverImage => record.cover_image = Some(asset.clone()),
            }
            record.updated_at = Utc::now();
            record.clone()
        }))
    }
}
