use std::sync::Arc;

use axum::extract::FromRef;

use crate::events::EventBus;
use crate::features::contests::services::ContestService;
use crate::middleware::auth::{AdminTokenVerifier, UserTokenVerifier};

/// Shared handles cloned into every request.
#[derive(Clone)]
pub struct AppState {
    pub contests: ContestService,
    pub events: EventBus,
    pub user_auth: Arc<UserTokenVerifier>,
    pub admin_auth: Arc<AdminTokenVerifier>,
}

impl FromRef<AppState> for ContestService {
    fn from_ref(state: &AppState) -> Self {
        state.contests.clone()
    }
}

impl FromRef<AppState> for EventBus {
    fn from_ref(state: &AppState) -> Self {
        state.events.clone()
    }
}

impl FromRef<AppState> for Arc<UserTokenVerifier> {
    fn from_ref(state: &AppState) -> Self {
        state.user_auth.clone()
    }
}

impl FromRef<AppState> for Arc<AdminTokenVerifier> {
    fn from_ref(state: &AppState) -> Self {
        state.admin_auth.clone()
    }
}
