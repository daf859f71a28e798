//! Argon2id password hashing for principal logins.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::{CommandErrorKind, GateError};

/// Hash a password with Argon2id and a fresh salt.
///
/// Returns the PHC string, which carries the salt and cost parameters.
///
/// # Errors
///
/// Returns `GateError::Command` if the hasher rejects the input.
pub fn hash_password(password: &str) -> Result<String, GateError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| GateError::Command {
            kind: CommandErrorKind::ExecutionFailed {
                message: format!("Failed to hash password: {e}"),
            },
        })
}

/// Check `password` against a stored PHC hash.
///
/// # Arguments
///
/// * `password` - Candidate password as presented by the caller
/// * `hash` - PHC string produced by [`hash_password`]
///
/// # Errors
///
/// Returns `GateError::Config` if `hash` is not a PHC string. A wrong
/// password is `Ok(false)`, not an error.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, GateError> {
    let parsed = parse_hash(hash)?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Reject stored hashes that are not PHC strings.
pub fn check_hash_format(hash: &str) -> Result<(), GateError> {
    parse_hash(hash).map(|_| ())
}

fn parse_hash(hash: &str) -> Result<PasswordHash<'_>, GateError> {
    PasswordHash::new(hash).map_err(|e| GateError::Config {
        message: format!("Invalid password hash format: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct-horse-battery-staple").unwrap();
        assert!(hash.starts_with("$argon2"));

        assert!(verify_password("correct-horse-battery-staple", &hash).unwrap());
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn test_salts_differ() {
        let a = hash_password("same-password").unwrap();
        let b = hash_password("same-password").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("same-password", &a).unwrap());
        assert!(verify_password("same-password", &b).unwrap());
    }

    #[test]
    fn test_invalid_hash_format() {
        assert!(verify_password("password", "not-a-valid-hash").is_err());
        assert!(check_hash_format("not-a-valid-hash").is_err());
    }
}
