pub mod validate;

use tracing::{error, info, instrument, warn};

use crate::{
    auth::token::{Claims, TokenAuthority},
    errors::IdentityError,
    users::{
        model::{NewUser, Session, UserRecord},
        repo::UserRepository,
    },
};

/// Composition root for registration, login and token checks.
#[derive(Clone)]
pub struct AccountService {
    users: UserRepository,
    tokens: TokenAuthority,
}

impl AccountService {
    pub fn new(users: UserRepository, tokens: TokenAuthority) -> Self {
        Self { users, tokens }
    }

    pub fn users(&self) -> &UserRepository {
        &self.users
    }

    /// validate -> create (uniqueness pre-check, hash, insert) -> issue token.
    ///
    /// A token failure after the insert leaves the user in place and reports
    /// `Internal`; the caller may simply log in afterwards.
    #[instrument(skip(self, form), fields(username = %form.username))]
    pub async fn register(&self, mut form: NewUser) -> Result<Session, IdentityError> {
        validate::registration(&mut form)?;

        let user = self.users.create(&form).await?;
        let token = self.tokens.issue(&user.username).map_err(|e| {
            error!(user_id = user.id, error = %e, "user created but token issuance failed");
            IdentityError::from(e)
        })?;

        info!(user_id = user.id, "user registered");
        Ok(Session { user, token })
    }

    /// `identifier` may be a username or an email. Unknown users and wrong
    /// passwords fail with the same `InvalidCredentials`.
    #[instrument(skip(self, password))]
    pub async fn login(&self, identifier: &str, password: &str) -> Result<Session, IdentityError> {
        let identifier = identifier.trim();
        if identifier.is_empty() || password.is_empty() {
            return Err(IdentityError::InvalidCredentials);
        }

        let hasher = self.users.hasher().clone();
        let password = password.to_owned();
        let mut user = match self
            .users
            .find_by_username_or_email(identifier, &identifier.to_lowercase())
            .await
        {
            Ok(u) => u,
            Err(IdentityError::NotFound) => {
                // Spend one hash so this path costs what a wrong password costs.
                let _ = tokio::task::spawn_blocking(move || hasher.hash(&password)).await;
                warn!("login for unknown user");
                return Err(IdentityError::InvalidCredentials);
            }
            Err(e) => return Err(e),
        };

        let stored = std::mem::take(&mut user.password_hash);
        let ok = tokio::task::spawn_blocking(move || hasher.verify(&stored, &password)).await?;
        if !ok {
            warn!(user_id = user.id, "login invalid password");
            return Err(IdentityError::InvalidCredentials);
        }

        let token = self.tokens.issue(&user.username)?;
        info!(user_id = user.id, "user logged in");
        Ok(Session { user, token })
    }

    /// Every protected path goes through here before trusting a caller.
    pub fn authenticate(&self, token: &str) -> Result<String, IdentityError> {
        Ok(self.tokens.verify(token)?)
    }

    /// Like `authenticate`, but keeps the issue time so callers can tell
    /// which account generation the token belongs to.
    pub fn authenticate_claims(&self, token: &str) -> Result<Claims, IdentityError> {
        Ok(self.tokens.verify_claims(token)?)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<UserRecord, IdentityError> {
        self.users.find_by_id(id).await
    }

    /// Record of the token's owner, without its hash.
    ///
    /// Usernames are freed on delete, so a token issued before the current
    /// row was created belongs to a previous owner and is `InvalidToken`.
    pub async fn current_user(&self, claims: &Claims) -> Result<UserRecord, IdentityError> {
        let mut user = self
            .users
            .find_by_username_or_email(&claims.username, "")
            .await?;
        if user.username != claims.username {
            return Err(IdentityError::NotFound);
        }

        let issued_at = i64::try_from(claims.iat).map_err(|_| IdentityError::InvalidToken)?;
        if let Some(created_at) = user.created_at {
            if issued_at < created_at.unix_timestamp() {
                warn!(user_id = user.id, "token predates the account it names");
                return Err(IdentityError::InvalidToken);
            }
        }

        user.password_hash.clear();
        Ok(user)
    }

    #[instrument(skip(self, claims), fields(username = %claims.username))]
    pub async fn delete_account(&self, claims: &Claims) -> Result<(), IdentityError> {
        let user = self.current_user(claims).await?;
        self.users.delete_by_id(user.id).await?;
        info!(user_id = user.id, "account deleted");
        Ok(())
    }
}
