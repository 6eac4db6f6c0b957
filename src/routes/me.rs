use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use tracing::{instrument, warn};

use crate::{
    auth::extractors::AuthUser, errors::IdentityError, state::AppState, users::model::UserRecord,
};

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me).delete(delete_me))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<UserRecord>, IdentityError> {
    let user = state.accounts.current_user(&claims).await.map_err(|e| {
        warn!(error = %e, "token owner not available");
        e
    })?;
    Ok(Json(user))
}

#[instrument(skip(state))]
pub async fn delete_me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<StatusCode, IdentityError> {
    state.accounts.delete_account(&claims).await?;
    Ok(StatusCode::NO_CONTENT)
}
