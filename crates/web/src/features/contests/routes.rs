use axum::{
    Router,
    routing::{delete, get, post},
};

use super::handlers::{
    get_contest, leaderboard, list_all_contests, list_contests, remove_entry, stream_events,
    submit_entry, update_statuses, user_entries, vote,
};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_contests))
        .route("/all", get(list_all_contests))
        .route("/events", get(stream_events))
        .route("/update-statuses", post(update_statuses))
        .route("/user/entries", get(user_entries))
        .route("/:id", get(get_contest))
        .route("/:id/submit", post(submit_entry))
        .route("/:id/vote", post(vote))
        .route("/:id/entries/:entry_id", delete(remove_entry))
        .route("/:id/leaderboard", get(leaderboard))
}
