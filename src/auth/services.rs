use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::dto::{
    AuthResponse, InitPasswordResetRequest, Profile, ResetPasswordRequest, SignInRequest,
    SignUpRequest, VerifyEmailRequest,
};
use super::jwt::JwtKeys;
use super::password::{check_strength, hash_password, verify_password, MIN_PASSWORD_LEN};
use super::repo_types::{NewUser, User};
use super::tokens::{self, RESET_TTL, VERIFICATION_TTL};
use crate::error::{AppError, AppResult};
use crate::mailer::{dispatch, token_link, Notification, Template};
use crate::state::AppState;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// `jOHN` → `John`.
pub(crate) fn name_case(raw: &str) -> String {
    let mut chars = raw.trim().chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

fn invalid_credentials() -> AppError {
    AppError::Unauthenticated("invalid credentials".into())
}

fn check_new_password(password: &str, confirm: &str) -> AppResult<()> {
    if !check_strength(password) {
        return Err(AppError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }
    if password != confirm {
        return Err(AppError::validation("confirmPassword must match password"));
    }
    Ok(())
}

fn notify(state: &AppState, user: &User, template: Template, base_url: &str, token: &str) {
    dispatch(
        state.mailer.clone(),
        Notification {
            recipient: user.email.clone(),
            template,
            first_name: user.first_name.clone(),
            link: token_link(base_url, token),
            year: OffsetDateTime::now_utc().year(),
        },
    );
}

fn respond(state: &AppState, user: &User) -> AppResult<AuthResponse> {
    let token = JwtKeys::from_ref(state).sign(user.id, &user.email)?;
    Ok(AuthResponse {
        user: Profile::from(user),
        token,
    })
}

async fn load_user(state: &AppState, id: Uuid) -> AppResult<User> {
    state
        .repo
        .find_user_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))
}

pub async fn sign_up(state: &AppState, body: SignUpRequest) -> AppResult<AuthResponse> {
    let first_name = name_case(&body.first_name);
    let last_name = name_case(&body.last_name);
    if first_name.is_empty() {
        return Err(AppError::validation("firstName is required"));
    }
    if last_name.is_empty() {
        return Err(AppError::validation("lastName is required"));
    }
    let email = body.email.trim().to_string();
    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(AppError::validation("email must be a valid email address"));
    }
    check_new_password(&body.password, &body.confirm_password)?;

    if state.repo.find_user_by_email(&email).await?.is_some() {
        warn!(%email, "email already registered");
        return Err(AppError::Conflict(
            "user with provided email already exists".into(),
        ));
    }

    let id = Uuid::new_v4();
    let verification = tokens::issue(id, VERIFICATION_TTL, OffsetDateTime::now_utc());
    let user = state
        .repo
        .create_user(
            NewUser {
                id,
                email,
                password_hash: hash_password(&body.password)?,
                first_name,
                last_name,
            },
            verification.clone(),
        )
        .await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    notify(
        state,
        &user,
        Template::SignUp,
        &state.config.email_verification_url,
        &verification.token,
    );
    respond(state, &user)
}

pub async fn sign_in(state: &AppState, body: SignInRequest) -> AppResult<AuthResponse> {
    let email = body.email.trim();
    let Some(user) = state.repo.find_user_by_email(email).await? else {
        warn!(%email, "sign-in with unknown email");
        return Err(invalid_credentials());
    };
    if !verify_password(&body.password, &user.password_hash)? {
        warn!(user_id = %user.id, "sign-in with wrong password");
        return Err(invalid_credentials());
    }

    info!(user_id = %user.id, "user signed in");
    respond(state, &user)
}

pub async fn profile(state: &AppState, owner: Uuid) -> AppResult<Profile> {
    Ok(Profile::from(&load_user(state, owner).await?))
}

/// Re-sends the verification link, reusing the token while it is valid.
pub async fn resend_verification(state: &AppState, owner: Uuid) -> AppResult<()> {
    let user = load_user(state, owner).await?;
    let token =
        tokens::current_verification_token(state.repo.as_ref(), owner, OffsetDateTime::now_utc())
            .await?;
    notify(
        state,
        &user,
        Template::SignUp,
        &state.config.email_verification_url,
        &token.token,
    );
    Ok(())
}

pub async fn verify_email(
    state: &AppState,
    owner: Uuid,
    body: VerifyEmailRequest,
) -> AppResult<Profile> {
    let stored = state
        .repo
        .verification_token(owner)
        .await?
        .ok_or_else(|| AppError::not_found("missing verification token"))?;
    tokens::check_verification(&stored, &body.verification_token, OffsetDateTime::now_utc())?;

    let user = state
        .repo
        .mark_email_verified(owner)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))?;
    info!(user_id = %owner, "email verified");
    Ok(Profile::from(&user))
}

pub async fn init_password_reset(state: &AppState, body: InitPasswordResetRequest) -> AppResult<()> {
    let user = state
        .repo
        .find_user_by_email(body.email.trim())
        .await?
        .ok_or_else(|| AppError::not_found("user with provided email doesn't exist"))?;

    let token = state
        .repo
        .upsert_reset_token(tokens::issue(user.id, RESET_TTL, OffsetDateTime::now_utc()))
        .await?;
    info!(user_id = %user.id, "password reset requested");
    notify(
        state,
        &user,
        Template::ResetPassword,
        &state.config.reset_password_url,
        &token.token,
    );
    Ok(())
}

pub async fn reset_password(state: &AppState, body: ResetPasswordRequest) -> AppResult<()> {
    check_new_password(&body.password, &body.confirm_password)?;

    let missing = || AppError::not_found("missing password reset token");
    let stored = state
        .repo
        .find_reset_token(&body.password_reset_token)
        .await?
        .ok_or_else(missing)?;
    if stored.is_expired(OffsetDateTime::now_utc()) {
        return Err(AppError::validation("expired password reset token"));
    }

    let hash = hash_password(&body.password)?;
    if !state
        .repo
        .consume_reset_token(&stored.token, &hash)
        .await?
    {
        return Err(missing());
    }
    info!(user_id = %stored.user_id, "password reset");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::testing::{FailingMailer, RecordingMailer};
    use std::sync::Arc;
    use time::Duration;

    const PASSWORD: &str = "qwerty!123456789";

    fn sign_up_body(email: &str) -> SignUpRequest {
        SignUpRequest {
            first_name: "jOHN".into(),
            last_name: "doe".into(),
            email: email.into(),
            password: PASSWORD.into(),
            confirm_password: PASSWORD.into(),
        }
    }

    fn token_of(link: &str) -> String {
        link.rsplit_once("?token=").map(|(_, t)| t.to_string()).unwrap()
    }

    #[test]
    fn validates_emails() {
        assert!(is_valid_email("john.doe@example.com"));
        assert!(!is_valid_email("john.doe@example"));
        assert!(!is_valid_email("john doe@example.com"));
        assert!(!is_valid_email("@example.com"));
    }

    #[test]
    fn name_cases_names() {
        assert_eq!(name_case("jOHN"), "John");
        assert_eq!(name_case("  łukasz "), "Łukasz");
        assert_eq!(name_case(""), "");
    }

    #[tokio::test]
    async fn sign_up_creates_unverified_user_with_live_token() {
        let mailer = RecordingMailer::default();
        let state = AppState::with_mailer(Arc::new(mailer.clone()));
        let res = sign_up(&state, sign_up_body(" John.Doe@Example.com ")).await.unwrap();

        assert_eq!(res.user.first_name, "John");
        assert_eq!(res.user.last_name, "Doe");
        assert_eq!(res.user.email, "John.Doe@Example.com");
        assert!(!res.user.is_email_verified);
        assert!(!res.token.is_empty());

        let stored = state.repo.verification_token(res.user.id).await.unwrap().unwrap();
        assert_eq!(stored.token.len(), 64);
        assert!(stored.expires_at > OffsetDateTime::now_utc() + Duration::hours(23));

        let sent = mailer.wait_for(1).await;
        assert_eq!(sent[0].template, Template::SignUp);
        assert_eq!(sent[0].recipient, "John.Doe@Example.com");
        assert_eq!(token_of(&sent[0].link), stored.token);
    }

    #[tokio::test]
    async fn sign_up_validates_payload() {
        let state = AppState::fake();
        let mut short = sign_up_body("a@b.co");
        short.password = "short".into();
        short.confirm_password = "short".into();
        let mut mismatch = sign_up_body("a@b.co");
        mismatch.confirm_password = "qwerty!12345678X".into();
        let mut nameless = sign_up_body("a@b.co");
        nameless.first_name = " ".into();

        for body in [short, mismatch, nameless, sign_up_body("not-an-email")] {
            let err = sign_up(&state, body).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{err:?}");
        }
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let state = AppState::fake();
        sign_up(&state, sign_up_body("ann@example.com")).await.unwrap();
        let err = sign_up(&state, sign_up_body("ann@example.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn mailer_failure_does_not_fail_sign_up() {
        let state = AppState::with_mailer(Arc::new(FailingMailer));
        assert!(sign_up(&state, sign_up_body("ann@example.com")).await.is_ok());
    }

    #[tokio::test]
    async fn sign_in_checks_credentials() {
        let state = AppState::fake();
        sign_up(&state, sign_up_body("ann@example.com")).await.unwrap();

        let ok = sign_in(
            &state,
            SignInRequest { email: "ann@example.com".into(), password: PASSWORD.into() },
        )
        .await
        .unwrap();
        assert_eq!(ok.user.email, "ann@example.com");

        for (email, password) in [("ann@example.com", "wrong-password-123"), ("bob@example.com", PASSWORD)] {
            let err = sign_in(
                &state,
                SignInRequest { email: email.into(), password: password.into() },
            )
            .await
            .unwrap_err();
            assert_eq!(err.to_string(), "invalid credentials");
        }
    }

    #[tokio::test]
    async fn verify_email_flips_flag_and_keeps_token() {
        let state = AppState::fake();
        let user = sign_up(&state, sign_up_body("ann@example.com")).await.unwrap().user;
        let stored = state.repo.verification_token(user.id).await.unwrap().unwrap();

        let err = verify_email(
            &state,
            user.id,
            VerifyEmailRequest { verification_token: "bogus".into() },
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "invalid verification token");

        let profile = verify_email(
            &state,
            user.id,
            VerifyEmailRequest { verification_token: stored.token.clone() },
        )
        .await
        .unwrap();
        assert!(profile.is_email_verified);
        assert_eq!(
            state.repo.verification_token(user.id).await.unwrap(),
            Some(stored)
        );
    }

    #[tokio::test]
    async fn password_reset_round() {
        let mailer = RecordingMailer::default();
        let state = AppState::with_mailer(Arc::new(mailer.clone()));
        let user = sign_up(&state, sign_up_body("ann@example.com")).await.unwrap().user;
        let old_hash = state.repo.find_user_by_id(user.id).await.unwrap().unwrap().password_hash;

        init_password_reset(&state, InitPasswordResetRequest { email: "ann@example.com".into() })
            .await
            .unwrap();
        let sent = mailer.wait_for(2).await;
        let reset = sent.iter().find(|n| n.template == Template::ResetPassword).unwrap();
        let token = token_of(&reset.link);

        let new_password = "brand-new-password-42";
        let body = || ResetPasswordRequest {
            password_reset_token: token.clone(),
            password: new_password.into(),
            confirm_password: new_password.into(),
        };
        reset_password(&state, body()).await.unwrap();

        let new_hash = state.repo.find_user_by_id(user.id).await.unwrap().unwrap().password_hash;
        assert_ne!(new_hash, old_hash);

        let err = reset_password(&state, body()).await.unwrap_err();
        assert_eq!(err.to_string(), "missing password reset token");

        let err = sign_in(
            &state,
            SignInRequest { email: "ann@example.com".into(), password: PASSWORD.into() },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated(_)));
        sign_in(
            &state,
            SignInRequest { email: "ann@example.com".into(), password: new_password.into() },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn reset_init_for_unknown_email_is_not_found() {
        let state = AppState::fake();
        let err = init_password_reset(
            &state,
            InitPasswordResetRequest { email: "ghost@example.com".into() },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn expired_reset_token_is_rejected() {
        let state = AppState::fake();
        let user = sign_up(&state, sign_up_body("ann@example.com")).await.unwrap().user;
        let past = OffsetDateTime::now_utc() - Duration::hours(1);
        let token = state
            .repo
            .upsert_reset_token(tokens::issue(user.id, RESET_TTL, past))
            .await
            .unwrap();

        let err = reset_password(
            &state,
            ResetPasswordRequest {
                password_reset_token: token.token,
                password: "another-long-password".into(),
                confirm_password: "another-long-password".into(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "expired password reset token");
    }
}
