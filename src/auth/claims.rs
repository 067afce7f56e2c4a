/// JWT Claims structures
///
/// Access tokens carry the identity fields handlers need; refresh tokens carry
/// only the subject plus a unique `jti` so two tokens minted in the same second
/// still differ.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::IdentityRecord;
use crate::error::AuthError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims that can be verified as a particular token kind.
pub trait TokenClaims: DeserializeOwned {
    const KIND: TokenKind;

    fn kind(&self) -> TokenKind;
    fn subject(&self) -> &str;

    /// Extract user ID from claims
    fn user_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(self.subject()).map_err(|_| AuthError::InvalidToken)
    }
}

/// JWT Claims for access tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AccessClaims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub typ: TokenKind,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
}

impl AccessClaims {
    pub fn new(identity: &IdentityRecord, expiry_seconds: i64, issuer: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: identity.id.to_string(),
            email: identity.email.clone(),
            username: identity.username.clone(),
            full_name: identity.full_name.clone(),
            typ: TokenKind::Access,
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer,
        }
    }
}

impl TokenClaims for AccessClaims {
    const KIND: TokenKind = TokenKind::Access;

    fn kind(&self) -> TokenKind {
        self.typ
    }

    fn subject(&self) -> &str {
        &self.sub
    }
}

/// JWT Claims for refresh tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RefreshClaims {
    pub sub: String,
    pub jti: String,
    pub typ: TokenKind,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
}

impl RefreshClaims {
    pub fn new(user_id: Uuid, expiry_seconds: i64, issuer: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            typ: TokenKind::Refresh,
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer,
        }
    }
}

impl TokenClaims for RefreshClaims {
    const KIND: TokenKind = TokenKind::Refresh;

    fn kind(&self) -> TokenKind {
        self.typ
    }

    fn subject(&self) -> &str {
        &self.sub
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn identity() -> IdentityRecord {
        IdentityRecord {
            id: Uuid::new_v4(),
            username: "ana".to_string(),
            email: "a@x.com".to_string(),
            full_name: "Ana".to_string(),
            password_hash: String::new(),
            refresh_token_hash: None,
            avatar: None,
            cover_image: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_access_claims_creation() {
        let identity = identity();
        let claims = AccessClaims::new(&identity, 3600, "test".to_string());

        assert_eq!(claims.sub, identity.id.to_string());
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.username, "ana");
        assert_eq!(claims.typ, TokenKind::Access);
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(claims.user_id().unwrap(), identity.id);
    }

    #[test]
    fn test_refresh_claims_are_unique() {
        let user_id = Uuid::new_v4();
        let first = RefreshClaims::new(user_id, 60, "test".to_string());
        let second = RefreshClaims::new(user_id, 60, "test".to_string());

        assert_ne!(first.jti, second.jti);
        assert_eq!(first.kind(), TokenKind::Refresh);
    }

    #[test]
    fn test_invalid_user_id() {
        let mut claims = RefreshClaims::new(Uuid::new_v4(), 60, "test".to_string());
        claims.sub = "invalid-uuid".to_string();

        assert!(claims.user_id().is_err());
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_value(TokenKind::Refresh).unwrap(), "refresh");
    }
}
