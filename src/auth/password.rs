//! Salted PBKDF2-HMAC-SHA256 password hashes in PHC string format
//! (`$pbkdf2-sha256$i=<rounds>,l=32$<salt>$<hash>`).
//!
//! The round count travels with each hash, so raising it does not
//! invalidate stored credentials.

use pbkdf2::password_hash::{
    PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
};
use pbkdf2::{Params, Pbkdf2};
use rand::rngs::OsRng;

use crate::error::AppError;

const HASH_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    pub fn new(iterations: u32) -> Self {
        Self {
            params: Params {
                rounds: iterations.max(1),
                output_length: HASH_LEN,
            },
        }
    }

    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Pbkdf2
            .hash_password_customized(password.as_bytes(), None, None, self.params.clone(), salt.as_salt())
            .map_err(|e| AppError::InternalError(format!("Password hashing failed: {}", e)))?;

        Ok(hash.to_string())
    }

    /// `false` for a wrong password and for anything that does not parse
    /// as a PBKDF2 PHC string.
    pub fn verify(&self, password: &str, encoded: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(encoded) else {
            return false;
        };
        Pbkdf2.verify_password(password.as_bytes(), &parsed).is_ok()
    }
}
