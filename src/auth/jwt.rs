use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{auth::claims::Claims, config::JwtConfig, error::AppError, state::AppState};

#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            secret,
            issuer,
            audience,
            ttl_minutes,
        } = state.config.jwt.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
            ttl: Duration::from_secs(ttl_minutes.max(0) as u64 * 60),
        }
    }
}

impl JwtKeys {
    pub fn sign(&self, user_id: Uuid, email: &str) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            uid: user_id,
            sub: email.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.uid, "jwt verified");
        Ok(data.claims)
    }
}

/// Splits `Bearer <token>`; anything other than exactly two fields is rejected.
fn bearer_token(header: &str) -> Option<&str> {
    let mut fields = header.split_whitespace();
    match (fields.next(), fields.next(), fields.next()) {
        (Some("Bearer"), Some(token), None) => Some(token),
        _ => None,
    }
}

/// Owner id resolved from a valid bearer token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let invalid_format =
            || AppError::Unauthenticated("invalid Authorization header format".into());
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthenticated("missing Authorization header".into()))?
            .to_str()
            .map_err(|_| invalid_format())?;

        let token = bearer_token(header).ok_or_else(invalid_format)?;

        let claims = keys.verify(token).map_err(|e| {
            warn!(error = %e, "rejected bearer token");
            AppError::Unauthenticated(e.to_string())
        })?;

        Ok(AuthUser(claims.uid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn make_keys(secret: &str, issuer: &str, audience: &str) -> JwtKeys {
        let mut state = AppState::fake();
        let config = std::sync::Arc::make_mut(&mut state.config);
        config.jwt = JwtConfig {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl_minutes: 5,
        };
        JwtKeys::from_ref(&state)
    }

    async fn extract(keys: &JwtKeys, header: Option<&str>) -> Result<AuthUser, AppError> {
        let mut builder = Request::builder().uri("/api/profile");
        if let Some(h) = header {
            builder = builder.header("Authorization", h);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        AuthUser::from_request_parts(&mut parts, keys).await
    }

    #[test]
    fn sign_and_verify_token() {
        let keys = make_keys("dev-secret", "test-issuer", "test-aud");
        let user_id = Uuid::new_v4();
        let token = keys.sign(user_id, "ann@example.com").expect("sign");
        let claims = keys.verify(&token).expect("verify token");
        assert_eq!(claims.uid, user_id);
        assert_eq!(claims.sub, "ann@example.com");
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.exp - claims.iat, 5 * 60);
    }

    #[test]
    fn verify_rejects_wrong_issuer_or_audience() {
        let good_keys = make_keys("same-secret", "good-iss", "good-aud");
        let bad_keys = make_keys("same-secret", "bad-iss", "bad-aud");
        let token = good_keys.sign(Uuid::new_v4(), "a@b.co").expect("sign");
        assert!(bad_keys.verify(&token).is_err());
    }

    #[test]
    fn bearer_header_must_have_two_fields() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("Bearer  abc "), Some("abc"));
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token("bearer abc"), None);
        assert_eq!(bearer_token("Bearer abc def"), None);
        assert_eq!(bearer_token("Token abc"), None);
    }

    #[tokio::test]
    async fn gate_reports_each_failure() {
        let keys = make_keys("secret", "iss", "aud");

        let err = extract(&keys, None).await.unwrap_err();
        assert_eq!(err.to_string(), "missing Authorization header");

        let err = extract(&keys, Some("Basic dXNlcg==")).await.unwrap_err();
        assert_eq!(err.to_string(), "invalid Authorization header format");

        let other = make_keys("other-secret", "iss", "aud");
        let forged = other.sign(Uuid::new_v4(), "x@y.zz").unwrap();
        let err = extract(&keys, Some(&format!("Bearer {forged}"))).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated(ref m) if m == "InvalidSignature"));

        let id = Uuid::new_v4();
        let token = keys.sign(id, "x@y.zz").unwrap();
        let AuthUser(resolved) = extract(&keys, Some(&format!("Bearer {token}"))).await.unwrap();
        assert_eq!(resolved, id);
    }

    #[tokio::test]
    async fn non_ascii_header_is_a_format_error() {
        let keys = make_keys("secret", "iss", "aud");
        let value = axum::http::HeaderValue::from_bytes(b"Bearer caf\xc3\xa9").unwrap();
        let (mut parts, _) = Request::builder()
            .uri("/api/profile")
            .header("Authorization", value)
            .body(())
            .unwrap()
            .into_parts();
        let err = AuthUser::from_request_parts(&mut parts, &keys).await.unwrap_err();
        assert_eq!(err.to_string(), "invalid Authorization header format");
    }

    #[tokio::test]
    async fn expired_tokens_are_rejected() {
        let keys = make_keys("secret", "iss", "aud");
        let past = OffsetDateTime::now_utc() - TimeDuration::hours(2);
        let claims = Claims {
            uid: Uuid::new_v4(),
            sub: "old@example.com".into(),
            iat: past.unix_timestamp() as usize,
            exp: (past + TimeDuration::minutes(5)).unix_timestamp() as usize,
            iss: "iss".into(),
            aud: "aud".into(),
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).unwrap();
        let err = extract(&keys, Some(&format!("Bearer {token}"))).await.unwrap_err();
        assert_eq!(err.to_string(), "ExpiredSignature");
    }
}
