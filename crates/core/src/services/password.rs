//! Password hashing and strength rules.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use mappoint_common::{AppError, AppResult};

/// Minimum length at registration and on password change.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Minimum length when resetting a forgotten password.
pub const MIN_RESET_PASSWORD_LEN: usize = 8;

const SPECIAL_CHARS: &str = "@$!%*?&";

/// Hash a password with argon2 and a fresh salt.
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Check a password against a stored hash.
pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Enforce the account password rule: at least six characters with a
/// lowercase letter, an uppercase letter and a digit, using only ASCII
/// letters, digits and `@$!%*?&`.
pub fn check_strength(password: &str) -> AppResult<()> {
    let allowed = password
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || SPECIAL_CHARS.contains(c));
    let strong = password.chars().count() >= MIN_PASSWORD_LEN
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit());

    if allowed && strong {
        Ok(())
    } else {
        Err(AppError::Validation(
            "Password must be at least 6 characters and contain a lowercase letter, an uppercase letter and a digit"
                .to_string(),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("Secret1").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("Secret1", &hash).unwrap());
        assert!(!verify_password("secret1", &hash).unwrap());
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(matches!(
            verify_password("Secret1", "not-a-hash"),
            Err(AppError::Internal(_))
        ));
    }

    #[test]
    fn test_strength() {
        assert!(check_strength("Abcde1").is_ok());
        assert!(check_strength("Str0ng@Pass!").is_ok());
        assert!(check_strength("Ab1").is_err());
        assert!(check_strength("abcdef1").is_err());
        assert!(check_strength("ABCDEF1").is_err());
        assert!(check_strength("Abcdefg").is_err());
        assert!(check_strength("Abcde1#").is_err());
        assert!(check_strength("Abcde1 x").is_err());
    }
}
