use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// User row in the database.
///
/// Projections that select fewer columns leave the remaining fields at their
/// defaults, which is why everything past `email` is `#[sqlx(default)]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[sqlx(default)]
    pub biography: Option<String>,
    #[sqlx(rename = "password", default)]
    #[serde(skip_serializing, default)]
    pub password_hash: String, // argon2 PHC string, never exposed in JSON
    #[sqlx(default)]
    #[serde(skip)]
    pub created_at: Option<OffsetDateTime>,
    #[sqlx(default)]
    #[serde(skip)]
    pub updated_at: Option<OffsetDateTime>,
    #[sqlx(default)]
    #[serde(skip)]
    pub deleted_at: Option<OffsetDateTime>,
}

/// Registration form as submitted by a caller.
#[derive(Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub biography: Option<String>,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("biography", &self.biography)
            .finish()
    }
}

/// Values written by a single insert; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUserRow {
    pub username: String,
    pub email: String,
    pub biography: Option<String>,
    pub password_hash: String,
}

/// A user together with a freshly issued bearer token.
#[derive(Debug, Serialize)]
pub struct Session {
    pub user: UserRecord,
    pub token: String,
}
