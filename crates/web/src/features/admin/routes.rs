use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{post, put},
};

use super::handlers::{calculate_winners, create_contest, delete_contest, update_contest};
use crate::middleware::auth::{AdminTokenVerifier, require_admin};
use crate::state::AppState;

pub fn routes(admin_auth: Arc<AdminTokenVerifier>) -> Router<AppState> {
    Router::new()
        .route("/", post(create_contest))
        .route("/:id", put(update_contest).delete(delete_contest))
        .route("/:id/calculate-winners", post(calculate_winners))
        .route_layer(middleware::from_fn_with_state(admin_auth, require_admin))
}
