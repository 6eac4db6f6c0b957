use std::{fmt, sync::Arc};

use argon2::{
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use thiserror::Error;
use tracing::{debug, error};

use crate::config::HashingConfig;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("password hashing secret is not configured")]
    MissingSecret,
    #[error("invalid argon2 parameters: {0}")]
    Params(String),
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// Argon2id hasher that mixes a server-side secret into every password.
///
/// Output is a PHC string, so salt and cost travel with the hash and `verify`
/// needs nothing but the stored value.
#[derive(Clone)]
pub struct PasswordHasher {
    secret: Arc<str>,
    argon2: Argon2<'static>,
}

impl fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl PasswordHasher {
    pub fn new(secret: &str, cost: &HashingConfig) -> Result<Self, HashError> {
        let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
            .map_err(|e| HashError::Params(e.to_string()))?;
        Ok(Self {
            secret: Arc::from(secret),
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    fn peppered(&self, plain: &str) -> String {
        format!("{plain}{}", self.secret)
    }

    pub fn hash(&self, plain: &str) -> Result<String, HashError> {
        if self.secret.is_empty() {
            return Err(HashError::MissingSecret);
        }
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(self.peppered(plain).as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                HashError::Hashing(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    /// Never tells a wrong password apart from a corrupt hash.
    pub fn verify(&self, hash: &str, plain: &str) -> bool {
        if self.secret.is_empty() {
            return false;
        }
        let parsed = match PasswordHash::new(hash) {
            Ok(p) => p,
            Err(e) => {
                debug!(error = %e, "stored hash is not a PHC string");
                return false;
            }
        };
        self.argon2
            .verify_password(self.peppered(plain).as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
pub(crate) fn test_hasher() -> PasswordHasher {
    let cost = HashingConfig {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    };
    PasswordHasher::new("pepper-for-tests", &cost).expect("cheap params are valid")
}
