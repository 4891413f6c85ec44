use std::convert::Infallible;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use chrono::Utc;
use futures::stream::{self, Stream};
use storage::dto::{
    common::{ApiResponse, SuccessResponse},
    contest::{
        ContestDetailResponse, LeaderboardEntry, RefreshSummary, SubmitEntryRequest,
        UserEntrySummary, VoteRequest, VoteResponse,
    },
};
use storage::models::{Contest, Entry};
use tokio::sync::broadcast::error::RecvError;

use crate::error::WebResult;
use crate::events::EventBus;
use crate::extractors::json::AppJson;
use crate::middleware::auth::AuthUser;

use super::services::{ContestService, parse_id, score_out_of_range};

#[utoipa::path(
    get,
    path = "/api/contests",
    responses(
        (status = 200, description = "Active and upcoming contests, active first", body = ApiResponse<Vec<Contest>>)
    ),
    tag = "contests"
)]
pub async fn list_contests(State(service): State<ContestService>) -> WebResult<Response> {
    let contests = service.list_open().await?;

    Ok(Json(ApiResponse::ok(contests)).into_response())
}

#[utoipa::path(
    get,
    path = "/api/contests/all",
    responses(
        (status = 200, description = "Every contest including completed ones", body = ApiResponse<Vec<Contest>>)
    ),
    tag = "contests"
)]
pub async fn list_all_contests(State(service): State<ContestService>) -> WebResult<Response> {
    let contests = service.list_all().await?;

    Ok(Json(ApiResponse::ok(contests)).into_response())
}

#[utoipa::path(
    get,
    path = "/api/contests/{id}",
    params(
        ("id" = String, Path, description = "Contest id")
    ),
    responses(
        (status = 200, description = "Contest with expanded entry posts", body = ApiResponse<ContestDetailResponse>),
        (status = 404, description = "Contest not found")
    ),
    tag = "contests"
)]
pub async fn get_contest(
    State(service): State<ContestService>,
    Path(id): Path<String>,
) -> WebResult<Response> {
    let detail = service.get_detail(parse_id(&id, "Contest")?).await?;

    Ok(Json(ApiResponse::ok(detail)).into_response())
}

#[utoipa::path(
    post,
    path = "/api/contests/{id}/submit",
    params(
        ("id" = String, Path, description = "Contest id")
    ),
    request_body = SubmitEntryRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "Entry submitted", body = ApiResponse<Entry>),
        (status = 400, description = "Contest not active or already entered"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Post belongs to someone else"),
        (status = 404, description = "Contest or post not found")
    ),
    tag = "contests"
)]
pub async fn submit_entry(
    State(service): State<ContestService>,
    user: AuthUser,
    Path(id): Path<String>,
    AppJson(req): AppJson<SubmitEntryRequest>,
) -> WebResult<Response> {
    let contest_id = parse_id(&id, "Contest")?;
    let entry = service
        .submit(contest_id, &user.user_id, &user.username, req.post_id, Utc::now())
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(entry))).into_response())
}

#[utoipa::path(
    post,
    path = "/api/contests/{id}/vote",
    params(
        ("id" = String, Path, description = "Contest id")
    ),
    request_body = VoteRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Vote recorded", body = ApiResponse<VoteResponse>),
        (status = 400, description = "Invalid score or contest not active"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Voting on own entry"),
        (status = 404, description = "Contest or entry not found"),
        (status = 409, description = "Contest was modified concurrently")
    ),
    tag = "contests"
)]
pub async fn vote(
    State(service): State<ContestService>,
    user: AuthUser,
    Path(id): Path<String>,
    AppJson(req): AppJson<VoteRequest>,
) -> WebResult<Response> {
    let contest_id = parse_id(&id, "Contest")?;
    let score = req.score.as_i64().ok_or_else(score_out_of_range)?;

    let outcome = service
        .vote(contest_id, req.entry_id, &user.user_id, score)
        .await?;

    Ok(Json(ApiResponse::ok(outcome)).into_response())
}

#[utoipa::path(
    get,
    path = "/api/contests/user/entries",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "The caller's entries across all contests", body = ApiResponse<Vec<UserEntrySummary>>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "contests"
)]
pub async fn user_entries(
    State(service): State<ContestService>,
    user: AuthUser,
) -> WebResult<Response> {
    let entries = service.user_entries(&user.user_id).await?;

    Ok(Json(ApiResponse::ok(entries)).into_response())
}

#[utoipa::path(
    delete,
    path = "/api/contests/{id}/entries/{entry_id}",
    params(
        ("id" = String, Path, description = "Contest id"),
        ("entry_id" = String, Path, description = "Entry id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Entry removed", body = SuccessResponse),
        (status = 400, description = "Contest already completed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Entry belongs to someone else"),
        (status = 404, description = "Contest or entry not found")
    ),
    tag = "contests"
)]
pub async fn remove_entry(
    State(service): State<ContestService>,
    user: AuthUser,
    Path((id, entry_id)): Path<(String, String)>,
) -> WebResult<Response> {
    let contest_id = parse_id(&id, "Contest")?;
    let entry_id = parse_id(&entry_id, "Entry")?;

    service
        .remove_entry(contest_id, entry_id, &user.user_id)
        .await?;

    Ok(Json(SuccessResponse::ok()).into_response())
}

#[utoipa::path(
    get,
    path = "/api/contests/{id}/leaderboard",
    params(
        ("id" = String, Path, description = "Contest id")
    ),
    responses(
        (status = 200, description = "All entries ranked by relevancy score", body = ApiResponse<Vec<LeaderboardEntry>>),
        (status = 404, description = "Contest not found")
    ),
    tag = "contests"
)]
pub async fn leaderboard(
    State(service): State<ContestService>,
    Path(id): Path<String>,
) -> WebResult<Response> {
    let board = service.leaderboard(parse_id(&id, "Contest")?).await?;

    Ok(Json(ApiResponse::ok(board)).into_response())
}

#[utoipa::path(
    post,
    path = "/api/contests/update-statuses",
    responses(
        (status = 200, description = "Statuses advanced for every due contest", body = ApiResponse<RefreshSummary>)
    ),
    tag = "contests"
)]
pub async fn update_statuses(State(service): State<ContestService>) -> WebResult<Response> {
    let summary = service.refresh_statuses(Utc::now()).await?;

    Ok(Json(ApiResponse::ok(summary)).into_response())
}

#[utoipa::path(
    get,
    path = "/api/contests/events",
    responses(
        (status = 200, description = "Server-sent stream of contest events", content_type = "text/event-stream")
    ),
    tag = "contests"
)]
pub async fn stream_events(
    State(events): State<EventBus>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = events.subscribe();

    let stream = stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let sse = Event::default()
                        .event(event.kind())
                        .json_data(&event)
                        .unwrap_or_else(|e| {
                            tracing::warn!("Failed to encode contest event: {}", e);
                            Event::default().comment("encoding error")
                        });
                    return Some((Ok(sse), receiver));
                }
                Err(RecvError::Lagged(missed)) => {
                    tracing::debug!(missed, "Event stream subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
