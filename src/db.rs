use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::auth::repo::{TokenRepo, UserRepo};
use crate::job_applications::repo::JobApplicationRepo;
use crate::resumes::repo::ResumeRepo;

/// Everything the handlers need from storage, as one object-safe trait.
pub trait Repository: UserRepo + TokenRepo + JobApplicationRepo + ResumeRepo {}

impl<T> Repository for T where T: UserRepo + TokenRepo + JobApplicationRepo + ResumeRepo {}

/// PostgreSQL-backed store; the per-domain `repo.rs` files implement the traits.
#[derive(Clone)]
pub struct PgStore {
    pub db: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { db })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .context("run migrations")?;
        Ok(())
    }
}
