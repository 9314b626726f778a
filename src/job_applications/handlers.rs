use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{
    CreateJobApplicationRequest, DeletedResponse, JobApplicationDetails, JobApplicationEntry,
    JobApplicationsParams, UpdateJobApplicationRequest,
};
use super::services;
use crate::{auth::jwt::AuthUser, error::AppResult, listing::PageBody, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/job-applications",
            get(list_job_applications).post(create_job_application),
        )
        .route(
            "/job-applications/:id",
            get(get_job_application)
                .put(update_job_application)
                .delete(delete_job_application),
        )
}

#[instrument(skip(state))]
pub async fn list_job_applications(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    params: Result<Query<JobApplicationsParams>, QueryRejection>,
) -> AppResult<Json<PageBody<JobApplicationEntry>>> {
    let Query(params) = params?;
    Ok(Json(services::list(&state, owner, params).await?))
}

#[instrument(skip(state))]
pub async fn get_job_application(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Json<JobApplicationDetails>> {
    let Path(id) = id?;
    Ok(Json(services::get(&state, owner, id).await?))
}

#[instrument(skip(state, body))]
pub async fn create_job_application(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    body: Result<Json<CreateJobApplicationRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<JobApplicationDetails>)> {
    let Json(body) = body?;
    let created = services::create(&state, owner, body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[instrument(skip(state, body))]
pub async fn update_job_application(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<UpdateJobApplicationRequest>, JsonRejection>,
) -> AppResult<Json<JobApplicationDetails>> {
    let Path(id) = id?;
    let Json(body) = body?;
    Ok(Json(services::update(&state, owner, id, body).await?))
}

#[instrument(skip(state))]
pub async fn delete_job_application(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Json<DeletedResponse>> {
    let Path(id) = id?;
    Ok(Json(services::delete(&state, owner, id).await?))
}
