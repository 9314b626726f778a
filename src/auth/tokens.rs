//! Issuance and expiry of email-verification and password-reset tokens.

use rand::{rngs::OsRng, RngCore};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::repo_types::IssuedToken;
use crate::db::Repository;
use crate::error::{AppError, AppResult};

pub const VERIFICATION_TTL: Duration = Duration::hours(24);
pub const RESET_TTL: Duration = Duration::minutes(15);

/// 32 random bytes, hex encoded.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn issue(user_id: Uuid, ttl: Duration, now: OffsetDateTime) -> IssuedToken {
    IssuedToken {
        user_id,
        token: generate_token(),
        expires_at: now + ttl,
    }
}

/// Returns the user's verification token, regenerating it only once expired.
pub async fn current_verification_token(
    repo: &dyn Repository,
    user_id: Uuid,
    now: OffsetDateTime,
) -> AppResult<IssuedToken> {
    let stored = repo
        .verification_token(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("missing verification token"))?;
    if !stored.is_expired(now) {
        return Ok(stored);
    }

    debug!(%user_id, "verification token expired, regenerating");
    repo.replace_verification_token(issue(user_id, VERIFICATION_TTL, now))
        .await?
        .ok_or_else(|| AppError::not_found("missing verification token"))
}

/// The presented token must be the stored one and still unexpired.
pub fn check_verification(
    stored: &IssuedToken,
    presented: &str,
    now: OffsetDateTime,
) -> AppResult<()> {
    if stored.token != presented {
        return Err(AppError::validation("invalid verification token"));
    }
    if stored.is_expired(now) {
        return Err(AppError::validation("expired verification token"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo::{TokenRepo, UserRepo};
    use crate::auth::repo_types::NewUser;
    use crate::memory::MemoryStore;
    use time::macros::datetime;

    #[test]
    fn tokens_are_64_hex_chars_and_unique() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert!(a.bytes().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn issue_sets_expiry_from_ttl() {
        let now = datetime!(2025-05-01 10:00 UTC);
        let token = issue(Uuid::nil(), RESET_TTL, now);
        assert_eq!(token.expires_at, datetime!(2025-05-01 10:15 UTC));
        assert!(!token.is_expired(now));
        assert!(token.is_expired(datetime!(2025-05-01 10:15 UTC)));
    }

    #[test]
    fn verification_check_distinguishes_mismatch_and_expiry() {
        let now = datetime!(2025-05-01 10:00 UTC);
        let stored = issue(Uuid::nil(), VERIFICATION_TTL, now);

        assert!(check_verification(&stored, &stored.token, now).is_ok());

        let err = check_verification(&stored, "nope", now).unwrap_err();
        assert_eq!(err.to_string(), "invalid verification token");

        let later = now + Duration::hours(25);
        let err = check_verification(&stored, &stored.token, later).unwrap_err();
        assert_eq!(err.to_string(), "expired verification token");
    }

    async fn user_with_token(store: &MemoryStore, issued_at: OffsetDateTime) -> Uuid {
        let id = Uuid::new_v4();
        let user = NewUser {
            id,
            email: "ann@example.com".into(),
            password_hash: "hash".into(),
            first_name: "Ann".into(),
            last_name: "Lee".into(),
        };
        store
            .create_user(user, issue(id, VERIFICATION_TTL, issued_at))
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn resend_keeps_valid_token() {
        let store = MemoryStore::default();
        let now = datetime!(2025-05-01 10:00 UTC);
        let user_id = user_with_token(&store, now).await;
        let original = store.verification_token(user_id).await.unwrap().unwrap();

        let resent = current_verification_token(&store, user_id, now + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(resent, original);
    }

    #[tokio::test]
    async fn resend_regenerates_expired_token() {
        let store = MemoryStore::default();
        let issued = datetime!(2025-05-01 10:00 UTC);
        let user_id = user_with_token(&store, issued).await;
        let original = store.verification_token(user_id).await.unwrap().unwrap();

        let now = issued + Duration::hours(30);
        let resent = current_verification_token(&store, user_id, now).await.unwrap();
        assert_ne!(resent.token, original.token);
        assert_eq!(resent.expires_at, now + VERIFICATION_TTL);
        assert_eq!(store.verification_token(user_id).await.unwrap(), Some(resent));
    }

    #[tokio::test]
    async fn resend_without_token_row_is_not_found() {
        let store = MemoryStore::default();
        let err = current_verification_token(&store, Uuid::new_v4(), OffsetDateTime::now_utc())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
