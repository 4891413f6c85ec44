use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use storage::{
    dto::{
        common::{ApiResponse, SuccessResponse},
        contest::{CreateContestRequest, UpdateContestRequest},
    },
    models::Contest,
};
use validator::Validate;

use crate::error::WebResult;
use crate::extractors::json::AppJson;
use crate::features::contests::services::{ContestService, parse_id};

#[utoipa::path(
    post,
    path = "/api/admin/contests",
    request_body = CreateContestRequest,
    security(
        ("admin_auth" = [])
    ),
    responses(
        (status = 201, description = "Contest created", body = ApiResponse<Contest>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "admin"
)]
pub async fn create_contest(
    State(service): State<ContestService>,
    AppJson(req): AppJson<CreateContestRequest>,
) -> WebResult<Response> {
    req.validate()?;

    let contest = service.create(req, Utc::now()).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(contest))).into_response())
}

#[utoipa::path(
    put,
    path = "/api/admin/contests/{id}",
    params(
        ("id" = String, Path, description = "Contest id")
    ),
    request_body = UpdateContestRequest,
    security(
        ("admin_auth" = [])
    ),
    responses(
        (status = 200, description = "Contest updated", body = ApiResponse<Contest>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Contest not found"),
        (status = 409, description = "Contest was modified concurrently")
    ),
    tag = "admin"
)]
pub async fn update_contest(
    State(service): State<ContestService>,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateContestRequest>,
) -> WebResult<Response> {
    let contest_id = parse_id(&id, "Contest")?;
    req.validate()?;

    let contest = service.update(contest_id, &req, Utc::now()).await?;

    Ok(Json(ApiResponse::ok(contest)).into_response())
}

#[utoipa::path(
    delete,
    path = "/api/admin/contests/{id}",
    params(
        ("id" = String, Path, description = "Contest id")
    ),
    security(
        ("admin_auth" = [])
    ),
    responses(
        (status = 200, description = "Contest deleted", body = SuccessResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Contest not found")
    ),
    tag = "admin"
)]
pub async fn delete_contest(
    State(service): State<ContestService>,
    Path(id): Path<String>,
) -> WebResult<Response> {
    service.delete(parse_id(&id, "Contest")?).await?;

    Ok(Json(SuccessResponse::ok()).into_response())
}

#[utoipa::path(
    post,
    path = "/api/admin/contests/{id}/calculate-winners",
    params(
        ("id" = String, Path, description = "Contest id")
    ),
    security(
        ("admin_auth" = [])
    ),
    responses(
        (status = 200, description = "Winners stored on the contest", body = ApiResponse<Contest>),
        (status = 400, description = "Contest has not completed"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Contest not found")
    ),
    tag = "admin"
)]
pub async fn calculate_winners(
    State(service): State<ContestService>,
    Path(id): Path<String>,
) -> WebResult<Response> {
    let contest = service.calculate_winners(parse_id(&id, "Contest")?).await?;

    Ok(Json(ApiResponse::ok(contest)).into_response())
}
