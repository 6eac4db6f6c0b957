use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::instrument;

use crate::{
    errors::IdentityError,
    state::AppState,
    users::model::{NewUser, Session, UserRecord},
};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/new", post(register))
        .route("/users/login", post(login))
        .route("/users/:id", get(get_user))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<NewUser>,
) -> Result<(StatusCode, Json<Session>), IdentityError> {
    let session = state.accounts.register(payload).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<Session>, IdentityError> {
    let session = state
        .accounts
        .login(&payload.username, &payload.password)
        .await?;
    Ok(Json(session))
}

/// Non-numeric or non-positive ids are reported as missing users.
#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserRecord>, IdentityError> {
    let id = id
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or(IdentityError::NotFound)?;
    let user = state.accounts.find_by_id(id).await?;
    Ok(Json(user))
}
