use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;

/// Application status; declaration order is the sort order (matches the SQL enum).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    InProgress,
    Rejected,
    Accepted,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::InProgress, Status::Rejected, Status::Accepted];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::InProgress => "IN_PROGRESS",
            Status::Rejected => "REJECTED",
            Status::Accepted => "ACCEPTED",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, AppError> {
        Self::ALL
            .into_iter()
            .find(|s| s.as_str() == raw)
            .ok_or_else(|| {
                AppError::validation("status must be one of [IN_PROGRESS REJECTED ACCEPTED]")
            })
    }
}

/// Job application record in the database.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct JobApplication {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_name: String,
    pub job_title: String,
    pub date_applied: OffsetDateTime,
    pub status: Status,
    pub is_replied: bool,
    pub min_salary: Option<f64>,
    pub max_salary: Option<f64>,
    pub job_posting_url: Option<String>,
    pub notes: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl JobApplication {
    /// The derived "salary" sort key: the greater of the two bounds.
    pub fn salary_key(&self) -> Option<f64> {
        match (self.min_salary, self.max_salary) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewJobApplication {
    pub company_name: String,
    pub job_title: String,
    pub date_applied: OffsetDateTime,
    pub status: Status,
    pub min_salary: Option<f64>,
    pub max_salary: Option<f64>,
    pub job_posting_url: Option<String>,
    pub notes: Option<String>,
}

/// Sparse update: `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobApplicationChanges {
    pub company_name: Option<String>,
    pub job_title: Option<String>,
    pub date_applied: Option<OffsetDateTime>,
    pub status: Option<Status>,
    pub is_replied: Option<bool>,
    pub min_salary: Option<f64>,
    pub max_salary: Option<f64>,
    pub job_posting_url: Option<String>,
    pub notes: Option<String>,
}

impl JobApplicationChanges {
    /// COALESCE-style merge, the in-process twin of the UPDATE statement.
    pub fn apply_to(&self, row: &mut JobApplication) {
        fn merge<T: Clone>(slot: &mut T, value: &Option<T>) {
            if let Some(v) = value {
                *slot = v.clone();
            }
        }
        fn merge_nullable<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                *slot = value.clone();
            }
        }

        merge(&mut row.company_name, &self.company_name);
        merge(&mut row.job_title, &self.job_title);
        merge(&mut row.date_applied, &self.date_applied);
        merge(&mut row.status, &self.status);
        merge(&mut row.is_replied, &self.is_replied);
        merge_nullable(&mut row.min_salary, &self.min_salary);
        merge_nullable(&mut row.max_salary, &self.max_salary);
        merge_nullable(&mut row.job_posting_url, &self.job_posting_url);
        merge_nullable(&mut row.notes, &self.notes);
    }
}
