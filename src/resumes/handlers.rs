use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use bytes::Bytes;
use tracing::instrument;
use uuid::Uuid;

use super::dto::{
    CreateResumeRequest, DeletedResponse, ResumeEntry, ResumesParams, UpdateResumeRequest,
};
use super::services;
use crate::{
    auth::jwt::AuthUser,
    error::{AppError, AppResult},
    listing::PageBody,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/resumes", get(list_resumes).post(create_resume))
        .route(
            "/resumes/:id",
            get(get_resume).put(update_resume).delete(delete_resume),
        )
}

#[instrument(skip(state))]
pub async fn list_resumes(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    params: Result<Query<ResumesParams>, QueryRejection>,
) -> AppResult<Json<PageBody<ResumeEntry>>> {
    let Query(params) = params?;
    Ok(Json(services::list(&state, owner, params).await?))
}

#[instrument(skip(state))]
pub async fn get_resume(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Json<ResumeEntry>> {
    let Path(id) = id?;
    Ok(Json(services::get(&state, owner, id).await?))
}

/// The body is optional, so it is read raw instead of through `Json`.
#[instrument(skip(state, body))]
pub async fn create_resume(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    body: Bytes,
) -> AppResult<(StatusCode, Json<ResumeEntry>)> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        CreateResumeRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::validation(format!("invalid request body: {e}")))?
    };
    let created = services::create(&state, owner, request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[instrument(skip(state, body))]
pub async fn update_resume(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<UpdateResumeRequest>, JsonRejection>,
) -> AppResult<Json<ResumeEntry>> {
    let Path(id) = id?;
    let Json(body) = body?;
    Ok(Json(services::update(&state, owner, id, body).await?))
}

#[instrument(skip(state))]
pub async fn delete_resume(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Json<DeletedResponse>> {
    let Path(id) = id?;
    Ok(Json(services::delete(&state, owner, id).await?))
}
