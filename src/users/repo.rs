use std::sync::Arc;

use tracing::{info, instrument, warn};

use super::model::{NewUser, NewUserRow, UserRecord};
use super::store::UserStore;
use crate::{auth::password::PasswordHasher, errors::IdentityError};

/// Owns the user record and its password lifecycle.
#[derive(Clone)]
pub struct UserRepository {
    store: Arc<dyn UserStore>,
    hasher: PasswordHasher,
}

impl UserRepository {
    pub fn new(store: Arc<dyn UserStore>, hasher: PasswordHasher) -> Self {
        Self { store, hasher }
    }

    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    /// Hashes the password and inserts the row. The returned copy has
    /// `password_hash` cleared.
    #[instrument(skip(self, form), fields(username = %form.username))]
    pub async fn create(&self, form: &NewUser) -> Result<UserRecord, IdentityError> {
        for (field, value) in [
            ("username", &form.username),
            ("email", &form.email),
            ("password", &form.password),
        ] {
            if value.trim().is_empty() {
                return Err(IdentityError::validation(format!("{field} must not be empty")));
            }
        }

        // The partial unique indexes are the real guard; this only gives
        // a friendlier error in the common case.
        if self.exists(&form.username, &form.email).await {
            warn!(email = %form.email, "username or email already registered");
            return Err(IdentityError::AlreadyExists);
        }

        let hasher = self.hasher.clone();
        let password = form.password.clone();
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password)).await??;

        let mut user = self
            .store
            .insert(NewUserRow {
                username: form.username.clone(),
                email: form.email.clone(),
                biography: form.biography.clone(),
                password_hash,
            })
            .await?;
        user.password_hash.clear();

        info!(user_id = user.id, "user row created");
        Ok(user)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<UserRecord, IdentityError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(IdentityError::NotFound)
    }

    pub async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<UserRecord, IdentityError> {
        self.store
            .find_by_username_or_email(username, email)
            .await?
            .ok_or(IdentityError::NotFound)
    }

    /// Only a definite `NotFound` counts as free. Store failures report the
    /// identity as taken so an outage cannot produce duplicate accounts.
    pub async fn exists(&self, username: &str, email: &str) -> bool {
        match self.find_by_username_or_email(username, email).await {
            Err(IdentityError::NotFound) => false,
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "uniqueness lookup failed; treating identity as taken");
                true
            }
        }
    }

    /// Soft delete: the row stays for audit but disappears from every lookup.
    #[instrument(skip(self))]
    pub async fn delete_by_id(&self, id: i64) -> Result<(), IdentityError> {
        if self.store.soft_delete(id).await? {
            info!(user_id = id, "user soft-deleted");
            Ok(())
        } else {
            Err(IdentityError::NotFound)
        }
    }

    /// Removes every row, soft-deleted ones included. Bootstrap and tests only.
    pub async fn reset(&self) -> Result<(), IdentityError> {
        self.store.truncate().await?;
        warn!("users table reset");
        Ok(())
    }
}
