use crate::config::{AppConfig, StorageKind};
use crate::db::{PgStore, Repository};
use crate::mailer::{LogMailer, Mailer};
use crate::memory::MemoryStore;
use anyhow::Context;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repository>,
    pub config: Arc<AppConfig>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let repo = match config.storage {
            StorageKind::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL is not set")?;
                let store = PgStore::connect(url).await?;
                store.migrate().await?;
                Arc::new(store) as Arc<dyn Repository>
            }
            StorageKind::Memory => {
                tracing::warn!("using in-memory storage; data is lost on restart");
                Arc::new(MemoryStore::default()) as Arc<dyn Repository>
            }
        };

        Ok(Self::from_parts(repo, config, Arc::new(LogMailer)))
    }

    pub fn from_parts(
        repo: Arc<dyn Repository>,
        config: Arc<AppConfig>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            repo,
            config,
            mailer,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::with_mailer(Arc::new(LogMailer))
    }

    #[cfg(test)]
    pub fn with_mailer(mailer: Arc<dyn Mailer>) -> Self {
        use time::macros::offset;

        let config = Arc::new(AppConfig {
            database_url: None,
            storage: StorageKind::Memory,
            jwt: crate::config::JwtConfig {
                secret: "test".into(),
                issuer: "test".into(),
                audience: "test".into(),
                ttl_minutes: 60,
            },
            frontend_url: None,
            email_verification_url: "https://app.test/verify-email".into(),
            reset_password_url: "https://app.test/reset-password".into(),
            date_filter_offset: offset!(+1),
        });

        Self::from_parts(Arc::new(MemoryStore::default()), config, mailer)
    }
}
