/// Password Hashing and Verification
///
/// Salted bcrypt hashes with a configured work factor. `bcrypt::verify`
/// compares digests in constant time.

use bcrypt::{hash, verify};

use crate::error::{AppError, ValidationError};

// bcrypt only reads the first 72 bytes of its input
const MAX_PASSWORD_LENGTH: usize = 72;

#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Hash a password using bcrypt
    ///
    /// # Errors
    /// Returns an internal error if bcrypt fails; callers abort the enclosing write.
    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        hash(password, self.cost)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
    }

    /// Verify a password against its hash
    ///
    /// A mismatch is `Ok(false)`. Only an unreadable stored digest is an error.
    pub fn verify(&self, password: &str, password_hash: &str) -> Result<bool, AppError> {
        verify(password, password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
    }
}

/// Reject passwords that are blank or longer than bcrypt can use.
pub fn validate_password(password: &str, field: &str) -> Result<(), ValidationError> {
    if password.trim().is_empty() {
        return Err(ValidationError::EmptyField(field.to_string()));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong(field.to_string(), MAX_PASSWORD_LENGTH));
    }

    Ok(())
}
