use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::dto::{
    AuthResponse, InitPasswordResetRequest, Profile, ResetPasswordRequest, SignInRequest,
    SignUpRequest, VerifyEmailRequest,
};
use super::jwt::AuthUser;
use super::services;
use crate::{error::AppResult, state::AppState};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/sign-up", post(sign_up))
        .route("/sign-in", post(sign_in))
        .route(
            "/password/reset",
            post(init_password_reset).put(reset_password),
        )
}

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile))
        .route(
            "/profile/verify-email",
            get(send_verification_email).patch(verify_email),
        )
}

#[instrument(skip(state, payload))]
pub async fn sign_up(
    State(state): State<AppState>,
    payload: Result<Json<SignUpRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let Json(payload) = payload?;
    let res = services::sign_up(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(res)))
}

#[instrument(skip(state, payload))]
pub async fn sign_in(
    State(state): State<AppState>,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> AppResult<Json<AuthResponse>> {
    let Json(payload) = payload?;
    Ok(Json(services::sign_in(&state, payload).await?))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Profile>> {
    Ok(Json(services::profile(&state, user_id).await?))
}

#[instrument(skip(state))]
pub async fn send_verification_email(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<StatusCode> {
    services::resend_verification(&state, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, payload))]
pub async fn verify_email(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<VerifyEmailRequest>, JsonRejection>,
) -> AppResult<Json<Profile>> {
    let Json(payload) = payload?;
    Ok(Json(services::verify_email(&state, user_id, payload).await?))
}

#[instrument(skip(state, payload))]
pub async fn init_password_reset(
    State(state): State<AppState>,
    payload: Result<Json<InitPasswordResetRequest>, JsonRejection>,
) -> AppResult<StatusCode> {
    let Json(payload) = payload?;
    services::init_password_reset(&state, payload).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    payload: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> AppResult<StatusCode> {
    let Json(payload) = payload?;
    services::reset_password(&state, payload).await?;
    Ok(StatusCode::NO_CONTENT)
}
