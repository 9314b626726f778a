use async_trait::async_trait;
use sqlx::{postgres::PgRow, FromRow, Row};
use uuid::Uuid;

use super::query::{ResumeColumn, ResumeQuery};
use super::repo_types::{next_untitled, Resume};
use crate::db::PgStore;
use crate::error::AppResult;
use crate::listing::{like_pattern, order_by_clause, Listing};

const COLUMNS: &str = "id, user_id, title, created_at, updated_at";

const FILTER: &str = r#"
    WHERE user_id = $1
      AND ($2::text IS NULL OR title ILIKE $2)
"#;

#[async_trait]
pub trait ResumeRepo: Send + Sync {
    async fn list_resumes(&self, query: &ResumeQuery) -> AppResult<Listing<Resume>>;
    async fn find_resume(&self, owner: Uuid, id: Uuid) -> AppResult<Option<Resume>>;
    /// Stores the resume; `None` picks the next `Untitled N` for the owner.
    async fn create_resume(&self, owner: Uuid, title: Option<String>) -> AppResult<Resume>;
    async fn update_resume(
        &self,
        owner: Uuid,
        id: Uuid,
        title: Option<String>,
    ) -> AppResult<Option<Resume>>;
    async fn delete_resume(&self, owner: Uuid, id: Uuid) -> AppResult<Option<Uuid>>;
}

#[async_trait]
impl ResumeRepo for PgStore {
    async fn list_resumes(&self, query: &ResumeQuery) -> AppResult<Listing<Resume>> {
        let sql = format!(
            "SELECT {COLUMNS}, COUNT(*) OVER() AS total\n    FROM resumes{FILTER}    ORDER BY {}\n    LIMIT $9 OFFSET $10",
            order_by_clause::<ResumeColumn>(3)
        );
        let pattern = query.title.as_deref().map(like_pattern);

        let mut q = sqlx::query(&sql).bind(query.owner).bind(&pattern);
        for flag in query.sort.flags() {
            q = q.bind(flag);
        }
        let rows: Vec<PgRow> = q
            .bind(query.paging.limit())
            .bind(query.paging.offset())
            .fetch_all(&self.db)
            .await?;

        let total = match rows.first() {
            Some(first) => first.try_get::<i64, _>("total")?,
            None => {
                let (count,): (i64,) =
                    sqlx::query_as(&format!("SELECT COUNT(*) FROM resumes{FILTER}"))
                        .bind(query.owner)
                        .bind(&pattern)
                        .fetch_one(&self.db)
                        .await?;
                count
            }
        };

        let rows = rows
            .iter()
            .map(Resume::from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Listing { rows, total })
    }

    async fn find_resume(&self, owner: Uuid, id: Uuid) -> AppResult<Option<Resume>> {
        let row = sqlx::query_as::<_, Resume>(&format!(
            "SELECT {COLUMNS} FROM resumes WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn create_resume(&self, owner: Uuid, title: Option<String>) -> AppResult<Resume> {
        let mut tx = self.db.begin().await?;

        let title = match title {
            Some(title) => title,
            None => {
                let taken: Vec<(String,)> = sqlx::query_as(
                    r#"SELECT title FROM resumes WHERE user_id = $1 AND title ~ '^Untitled [0-9]+$'"#,
                )
                .bind(owner)
                .fetch_all(&mut *tx)
                .await?;
                next_untitled(taken.iter().map(|(t,)| t.as_str()))
            }
        };

        // A concurrent insert of the same title trips resumes_user_id_title_key.
        let row = sqlx::query_as::<_, Resume>(&format!(
            "INSERT INTO resumes (user_id, title) VALUES ($1, $2) RETURNING {COLUMNS}"
        ))
        .bind(owner)
        .bind(&title)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row)
    }

    async fn update_resume(
        &self,
        owner: Uuid,
        id: Uuid,
        title: Option<String>,
    ) -> AppResult<Option<Resume>> {
        let row = sqlx::query_as::<_, Resume>(&format!(
            r#"
            UPDATE resumes
               SET title = COALESCE($3, title), updated_at = NOW()
             WHERE id = $1 AND user_id = $2
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(owner)
        .bind(&title)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn delete_resume(&self, owner: Uuid, id: Uuid) -> AppResult<Option<Uuid>> {
        let deleted: Option<(Uuid,)> =
            sqlx::query_as("DELETE FROM resumes WHERE id = $1 AND user_id = $2 RETURNING id")
                .bind(id)
                .bind(owner)
                .fetch_optional(&self.db)
                .await?;
        Ok(deleted.map(|(id,)| id))
    }
}
