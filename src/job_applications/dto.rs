use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{JobApplication, Status};

/// Query string of `GET /job-applications`.
#[derive(Debug, Default, Deserialize)]
pub struct JobApplicationsParams {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub sort: Option<String>,
    pub company_name_or_job_title: Option<String>,
    pub date_applied: Option<String>,
    pub status: Option<String>,
}

/// One row of the list response; nullable columns are omitted when empty.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobApplicationEntry {
    pub id: Uuid,
    pub company_name: String,
    pub job_title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date_applied: OffsetDateTime,
    pub status: Status,
    pub is_replied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_salary: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_salary: Option<f64>,
    #[serde(rename = "jobPostingURL", skip_serializing_if = "Option::is_none")]
    pub job_posting_url: Option<String>,
}

impl From<JobApplication> for JobApplicationEntry {
    fn from(row: JobApplication) -> Self {
        Self {
            id: row.id,
            company_name: row.company_name,
            job_title: row.job_title,
            date_applied: row.date_applied,
            status: row.status,
            is_replied: row.is_replied,
            min_salary: row.min_salary,
            max_salary: row.max_salary,
            job_posting_url: row.job_posting_url,
        }
    }
}

/// Full record returned by detail, create and update.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobApplicationDetails {
    #[serde(flatten)]
    pub entry: JobApplicationEntry,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl From<JobApplication> for JobApplicationDetails {
    fn from(mut row: JobApplication) -> Self {
        let notes = row.notes.take();
        Self { entry: row.into(), notes }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobApplicationRequest {
    pub company_name: String,
    pub job_title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date_applied: OffsetDateTime,
    pub status: String,
    pub min_salary: Option<f64>,
    pub max_salary: Option<f64>,
    #[serde(rename = "jobPostingURL")]
    pub job_posting_url: Option<String>,
    pub notes: Option<String>,
}

/// Every field is optional: an absent key leaves the column untouched.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateJobApplicationRequest {
    pub company_name: Option<String>,
    pub job_title: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub date_applied: Option<OffsetDateTime>,
    pub status: Option<String>,
    pub is_replied: Option<bool>,
    pub min_salary: Option<f64>,
    pub max_salary: Option<f64>,
    #[serde(rename = "jobPostingURL")]
    pub job_posting_url: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub id: Uuid,
}
