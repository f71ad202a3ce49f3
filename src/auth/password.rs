//! Password Hashing and Verification
//!
//! bcrypt hashes are self-describing (`$2b$<cost>$<salt><digest>`), so
//! verification always re-derives the digest from the salt and cost stored in
//! the hash and compares in constant time. Never hash the candidate again and
//! compare hash strings: a fresh salt makes that comparison fail every time.

use bcrypt::{hash, verify, DEFAULT_COST};

use crate::error::{AppError, AuthError};

/// bcrypt hasher with a configurable cost factor
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self { cost: DEFAULT_COST }
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a password with a fresh random salt
    ///
    /// # Errors
    /// Returns `Internal` if bcrypt rejects the cost or fails to hash
    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        hash(password, self.cost)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
    }
}

/// Verify a password against a stored bcrypt hash
///
/// # Errors
/// `InvalidCredential` on mismatch, and also when the stored hash cannot be
/// parsed (the caller learns nothing beyond "credentials rejected").
pub fn verify_password(password: &str, password_hash: &str) -> Result<(), AuthError> {
    match verify(password, password_hash) {
        Ok(true) => Ok(()),
        Ok(false) => Err(AuthError::InvalidCredential),
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash could not be parsed");
            Err(AuthError::InvalidCredential)
        }
    }
}

/// Login-time password check
///
/// Holds a decoy hash made with the configured cost so that an attempt for an
/// unknown account spends the same bcrypt work as one for a known account.
#[derive(Debug, Clone)]
pub struct PasswordVerifier {
    decoy_hash: String,
}

impl PasswordVerifier {
    /// # Errors
    /// Returns `Internal` if the decoy hash cannot be produced
    pub fn new(hasher: &PasswordHasher) -> Result<Self, AppError> {
        let decoy_hash = hasher.hash("decoy password for unknown accounts")?;
        Ok(Self { decoy_hash })
    }

    /// Verify `password` against the stored hash, or the decoy when the
    /// account does not exist
    ///
    /// # Errors
    /// `InvalidCredential` on mismatch or when there is no stored hash
    pub fn verify(&self, password: &str, stored_hash: Option<&str>) -> Result<(), AuthError> {
        match stored_hash {
            Some(password_hash) => verify_password(password, password_hash),
            None => {
                // Result ignored: the account is unknown either way
                let _ = verify(password, &self.decoy_hash);
                Err(AuthError::InvalidCredential)
            }
        }
    }
}
