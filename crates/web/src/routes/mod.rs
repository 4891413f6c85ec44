use axum::{Json, Router, routing::get};
use serde_json::{Value, json};

use crate::error::WebError;
use crate::features::{admin, contests};
use crate::state::AppState;

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn route_not_found() -> WebError {
    WebError::NotFound("Route not found".into())
}

/// The full API without docs or transport layers, ready to serve or test.
pub fn app(state: AppState) -> Router {
    let admin_auth = state.admin_auth.clone();

    Router::new()
        .route("/health", get(health))
        .nest("/api/contests", contests::routes::routes())
        .nest("/api/admin/contests", admin::routes::routes(admin_auth))
        .fallback(route_not_found)
        .with_state(state)
}
