/// Authentication module
///
/// Password hashing, JWT issuance/verification and refresh-token digests.

mod claims;
mod jwt;
mod password;
mod refresh_token;

pub use claims::{AccessClaims, RefreshClaims, TokenClaims, TokenKind};
pub use jwt::{TokenIssuer, TokenPair, TokenVerifier};
pub use password::{validate_password, PasswordHasher};
pub use refresh_token::hash_token;
