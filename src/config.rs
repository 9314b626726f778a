use anyhow::Context;
use time::{macros::format_description, UtcOffset};

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Where rows live: PostgreSQL in production, a process-local store for dev runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub storage: StorageKind,
    pub jwt: JwtConfig,
    pub frontend_url: Option<String>,
    pub email_verification_url: String,
    pub reset_password_url: String,
    /// Calendar dates in list filters are compared at this offset.
    pub date_filter_offset: UtcOffset,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let storage = match std::env::var("STORAGE").as_deref() {
            Ok("memory") => StorageKind::Memory,
            Ok("postgres") | Err(_) => StorageKind::Postgres,
            Ok(other) => anyhow::bail!("unknown STORAGE value: {other}"),
        };
        let database_url = match storage {
            StorageKind::Postgres => {
                Some(std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?)
            }
            StorageKind::Memory => std::env::var("DATABASE_URL").ok(),
        };
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "career-compass".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "career-compass-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24),
        };
        let date_filter_offset = parse_offset(
            &std::env::var("DATE_FILTER_UTC_OFFSET").unwrap_or_else(|_| "+01:00".into()),
        )?;

        Ok(Self {
            database_url,
            storage,
            jwt,
            frontend_url: std::env::var("FRONTEND_URL").ok(),
            email_verification_url: std::env::var("EMAIL_VERIFICATION_URL")
                .unwrap_or_else(|_| "http://localhost:5173/verify-email".into()),
            reset_password_url: std::env::var("RESET_PASSWORD_URL")
                .unwrap_or_else(|_| "http://localhost:5173/reset-password".into()),
            date_filter_offset,
        })
    }
}

/// Parses offsets written as `+HH:MM` / `-HH:MM`.
pub fn parse_offset(raw: &str) -> anyhow::Result<UtcOffset> {
    UtcOffset::parse(
        raw.trim(),
        format_description!("[offset_hour sign:mandatory]:[offset_minute]"),
    )
    .with_context(|| format!("invalid UTC offset '{raw}'"))
}
