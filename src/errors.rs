use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::auth::{password::HashError, token::TokenError};
use crate::users::store::StoreError;

/// Error taxonomy returned by every public operation of the identity core.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("{0}")]
    Validation(String),
    #[error("user already exists")]
    AlreadyExists,
    #[error("user not found")]
    NotFound,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("internal error: {0}")]
    Internal(String),
}

impl IdentityError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Validation(_) | Self::AlreadyExists | Self::InvalidCredentials => {
                StatusCode::BAD_REQUEST
            }
            Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<HashError> for IdentityError {
    fn from(e: HashError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<TokenError> for IdentityError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Invalid => Self::InvalidToken,
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<StoreError> for IdentityError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UniqueViolation => Self::AlreadyExists,
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for IdentityError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Internal(format!("blocking task failed: {e}"))
    }
}

impl IntoResponse for IdentityError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Internal details stay in the logs.
        let message = match &self {
            Self::Internal(detail) => {
                error!(error = %detail, "internal error");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_matches_caller_contract() {
        assert_eq!(IdentityError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(IdentityError::AlreadyExists.status(), StatusCode::BAD_REQUEST);
        assert_eq!(IdentityError::InvalidCredentials.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            IdentityError::validation("bad email").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(IdentityError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            IdentityError::Internal("db down".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn component_errors_keep_their_class() {
        assert!(matches!(
            IdentityError::from(TokenError::Invalid),
            IdentityError::InvalidToken
        ));
        assert!(matches!(
            IdentityError::from(TokenError::Signing("boom".into())),
            IdentityError::Internal(_)
        ));
        assert!(matches!(
            IdentityError::from(StoreError::UniqueViolation),
            IdentityError::AlreadyExists
        ));
        assert!(matches!(
            IdentityError::from(StoreError::Unavailable("down".into())),
            IdentityError::Internal(_)
        ));
        assert!(matches!(
            IdentityError::from(HashError::MissingSecret),
            IdentityError::Internal(_)
        ));
    }
}
