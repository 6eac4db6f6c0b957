pub mod me;
pub mod users;

use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(users::user_routes())
        .merge(me::me_routes())
}
