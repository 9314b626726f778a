use async_trait::async_trait;
use sqlx::{postgres::PgRow, FromRow, Row};
use uuid::Uuid;

use super::query::{JobApplicationQuery, JobColumn};
use super::repo_types::{JobApplication, JobApplicationChanges, NewJobApplication};
use crate::db::PgStore;
use crate::error::AppResult;
use crate::listing::{like_pattern, order_by_clause, Listing};

const COLUMNS: &str = "id, user_id, company_name, job_title, date_applied, status, is_replied, \
     min_salary, max_salary, job_posting_url, notes, created_at, updated_at";

/// Owner scope plus the optional filters; `$1`..`$5` are shared by the page
/// query and the fallback count.
const FILTER: &str = r#"
    WHERE user_id = $1
      AND ($2::text IS NULL OR company_name ILIKE $2 OR job_title ILIKE $2)
      AND ($3::date IS NULL
           OR ((date_applied AT TIME ZONE 'UTC') + $4::int * INTERVAL '1 second')::date = $3::date)
      AND ($5::status IS NULL OR status = $5::status)
"#;

#[async_trait]
pub trait JobApplicationRepo: Send + Sync {
    async fn list_job_applications(
        &self,
        query: &JobApplicationQuery,
    ) -> AppResult<Listing<JobApplication>>;
    async fn find_job_application(&self, owner: Uuid, id: Uuid)
        -> AppResult<Option<JobApplication>>;
    async fn create_job_application(
        &self,
        owner: Uuid,
        new: NewJobApplication,
    ) -> AppResult<JobApplication>;
    /// Applies the sparse changes; `None` when `(id, owner)` matches no row.
    async fn update_job_application(
        &self,
        owner: Uuid,
        id: Uuid,
        changes: &JobApplicationChanges,
    ) -> AppResult<Option<JobApplication>>;
    async fn delete_job_application(&self, owner: Uuid, id: Uuid) -> AppResult<Option<Uuid>>;
}

#[async_trait]
impl JobApplicationRepo for PgStore {
    async fn list_job_applications(
        &self,
        query: &JobApplicationQuery,
    ) -> AppResult<Listing<JobApplication>> {
        let sql = format!(
            "SELECT {COLUMNS}, COUNT(*) OVER() AS total\n    FROM job_applications{FILTER}    ORDER BY {}\n    LIMIT $18 OFFSET $19",
            order_by_clause::<JobColumn>(6)
        );
        let pattern = query.company_name_or_job_title.as_deref().map(like_pattern);

        let mut q = sqlx::query(&sql)
            .bind(query.owner)
            .bind(&pattern)
            .bind(query.date_applied)
            .bind(query.date_offset.whole_seconds())
            .bind(query.status);
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
                // Window counts vanish with the rows; count separately.
                let (count,): (i64,) =
                    sqlx::query_as(&format!("SELECT COUNT(*) FROM job_applications{FILTER}"))
                        .bind(query.owner)
                        .bind(&pattern)
                        .bind(query.date_applied)
                        .bind(query.date_offset.whole_seconds())
                        .bind(query.status)
                        .fetch_one(&self.db)
                        .await?;
                count
            }
        };

        let rows = rows
            .iter()
            .map(JobApplication::from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Listing { rows, total })
    }

    async fn find_job_application(
        &self,
        owner: Uuid,
        id: Uuid,
    ) -> AppResult<Option<JobApplication>> {
        let row = sqlx::query_as::<_, JobApplication>(&format!(
            "SELECT {COLUMNS} FROM job_applications WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn create_job_application(
        &self,
        owner: Uuid,
        new: NewJobApplication,
    ) -> AppResult<JobApplication> {
        let row = sqlx::query_as::<_, JobApplication>(&format!(
            r#"
            INSERT INTO job_applications
                (user_id, company_name, job_title, date_applied, status,
                 min_salary, max_salary, job_posting_url, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(owner)
        .bind(&new.company_name)
        .bind(&new.job_title)
        .bind(new.date_applied)
        .bind(new.status)
        .bind(new.min_salary)
        .bind(new.max_salary)
        .bind(&new.job_posting_url)
        .bind(&new.notes)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn update_job_application(
        &self,
        owner: Uuid,
        id: Uuid,
        changes: &JobApplicationChanges,
    ) -> AppResult<Option<JobApplication>> {
        let row = sqlx::query_as::<_, JobApplication>(&format!(
            r#"
            UPDATE job_applications SET
                company_name    = COALESCE($3, company_name),
                job_title       = COALESCE($4, job_title),
                date_applied    = COALESCE($5, date_applied),
                status          = COALESCE($6::status, status),
                is_replied      = COALESCE($7, is_replied),
                min_salary      = COALESCE($8, min_salary),
                max_salary      = COALESCE($9, max_salary),
                job_posting_url = COALESCE($10, job_posting_url),
                notes           = COALESCE($11, notes),
                updated_at      = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(owner)
        .bind(&changes.company_name)
        .bind(&changes.job_title)
        .bind(changes.date_applied)
        .bind(changes.status)
        .bind(changes.is_replied)
        .bind(changes.min_salary)
        .bind(changes.max_salary)
        .bind(&changes.job_posting_url)
        .bind(&changes.notes)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn delete_job_application(&self, owner: Uuid, id: Uuid) -> AppResult<Option<Uuid>> {
        let deleted: Option<(Uuid,)> = sqlx::query_as(
            "DELETE FROM job_applications WHERE id = $1 AND user_id = $2 RETURNING id",
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.db)
        .await?;
        Ok(deleted.map(|(id,)| id))
    }
}
