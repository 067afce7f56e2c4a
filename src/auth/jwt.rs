/// JWT Token Issuance and Verification
///
/// Access and refresh tokens are HS256 JWTs signed with separate secrets and
/// tagged with a `typ` claim, so neither kind verifies as the other.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::claims::{AccessClaims, RefreshClaims, TokenClaims, TokenKind};
use crate::configuration::TokenSettings;
use crate::domain::IdentityRecord;
use crate::error::{AppError, AuthError};

/// A freshly minted access/refresh token pair
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct TokenIssuer {
    access_key: EncodingKey,
    refresh_key: EncodingKey,
    access_ttl: i64,
    refresh_ttl: i64,
    issuer: String,
}

impl TokenIssuer {
    pub fn new(config: &TokenSettings) -> Self {
        Self {
            access_key: EncodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_key: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
            issuer: config.issuer.clone(),
        }
    }

    /// Generate a new access token for an identity
    ///
    /// # Errors
    /// Returns error if token signing fails
    pub fn issue_access(&self, identity: &IdentityRecord) -> Result<String, AppError> {
        let claims = AccessClaims::new(identity, self.access_ttl, self.issuer.clone());
        sign(&claims, &self.access_key)
    }

    /// Generate a new refresh token binding only the user id
    pub fn issue_refresh(&self, user_id: Uuid) -> Result<String, AppError> {
        let claims = RefreshClaims::new(user_id, self.refresh_ttl, self.issuer.clone());
        sign(&claims, &self.refresh_key)
    }

    pub fn issue_pair(&self, identity: &IdentityRecord) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access_token: self.issue_access(identity)?,
            refresh_token: self.issue_refresh(identity.id)?,
        })
    }
}

fn sign<C: Serialize>(claims: &C, key: &EncodingKey) -> Result<String, AppError> {
    encode(&Header::new(Algorithm::HS256), claims, key)
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

#[derive(Clone)]
pub struct TokenVerifier {
    access_key: DecodingKey,
    refresh_key: DecodingKey,
    issuer: String,
}

impl TokenVerifier {
    pub fn new(config: &TokenSettings) -> Self {
        Self {
            access_key: DecodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_key: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
            issuer: config.issuer.clone(),
        }
    }

    /// Validate a token as the kind described by `C`
    ///
    /// Checks signature against the secret for that kind, expiry with no
    /// leeway, issuer, and the `typ` claim.
    ///
    /// # Errors
    /// `AuthError::InvalidToken` for every failure; the reason is only logged.
    pub fn verify<C: TokenClaims>(&self, token: &str) -> Result<C, AuthError> {
        let key = match C::KIND {
            TokenKind::Access => &self.access_key,
            TokenKind::Refresh => &self.refresh_key,
        };

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iat", "iss", "sub"]);
        validation.leeway = 0;

        let claims = decode::<C>(token, key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::warn!(kind = ?C::KIND, error = %e, "JWT validation error");
                AuthError::InvalidToken
            })?;

        if claims.kind() != C::KIND {
            tracing::warn!(expected = ?C::KIND, actual = ?claims.kind(), "JWT kind mismatch");
            return Err(AuthError::InvalidToken);
        }

        Ok(claims)
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, AuthError> {
        self.verify::<AccessClaims>(token)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, AuthError> {
        self.verify::<RefreshClaims>(token)
    }
}
