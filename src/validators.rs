/// Input validators for account fields
/// Features:
/// 1. DoS Protection: Input length limits
/// 2. Normalisation: trimmed, lower-cased identifiers
/// 3. Phishing Protection: Email validation

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 5;
const MAX_USERNAME_LENGTH: usize = 64;
const MAX_NAME_LENGTH: usize = 256;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();

    // Channel handles appear in URLs (`/c/{username}`)
    static ref USERNAME_REGEX: Regex = Regex::new(r"^[a-z0-9._-]+$").unwrap();
}

/// Validates and normalises an email address
/// - Trims and lower-cases
/// - Checks format using RFC 5322 simplified regex
/// - Verifies length constraints
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let normalized = email.trim().to_lowercase();

    if normalized.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }

    if normalized.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email".to_string(), MIN_EMAIL_LENGTH));
    }

    if normalized.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email".to_string(), MAX_EMAIL_LENGTH));
    }

    if !EMAIL_REGEX.is_match(&normalized) {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }

    if has_suspicious_email_patterns(&normalized) {
        return Err(ValidationError::SuspiciousContent("email".to_string()));
    }

    Ok(normalized)
}

/// Validates and normalises a username (trimmed, lower-cased)
pub fn is_valid_username(username: &str) -> Result<String, ValidationError> {
    let normalized = username.trim().to_lowercase();

    if normalized.is_empty() {
        return Err(ValidationError::EmptyField("username".to_string()));
    }

    if normalized.len() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::TooLong("username".to_string(), MAX_USERNAME_LENGTH));
    }

    if !USERNAME_REGEX.is_match(&normalized) {
        return Err(ValidationError::InvalidFormat("username".to_string()));
    }

    Ok(normalized)
}

/// Validates a display name
/// - Checks length constraints
/// - Validates against control characters
pub fn is_valid_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("fullName".to_string()));
    }

    if trimmed.len() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong("fullName".to_string(), MAX_NAME_LENGTH));
    }

    if has_suspicious_name_patterns(trimmed) {
        return Err(ValidationError::SuspiciousContent("fullName".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Normalises a login identifier, which may be either a username or an email.
pub fn normalize_identifier(identifier: &str) -> Result<String, ValidationError> {
    let normalized = identifier.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(ValidationError::EmptyField("username or email".to_string()));
    }
    Ok(normalized)
}

fn has_suspicious_email_patterns(email: &str) -> bool {
    // Extremely long local part is a phishing indicator
    if let Some(at_pos) = email.find('@') {
        if email[..at_pos].len() > 64 {
            return true;
        }
    }

    if email.matches('@').count() != 1 {
        return true;
    }

    email.contains('\0')
}

fn has_suspicious_name_patterns(name: &str) -> bool {
    name.chars().any(|c| c.is_control())
}
