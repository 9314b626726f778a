use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::Resume;

#[derive(Debug, Default, Deserialize)]
pub struct ResumesParams {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub sort: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeEntry {
    pub id: Uuid,
    pub title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Resume> for ResumeEntry {
    fn from(row: Resume) -> Self {
        Self {
            id: row.id,
            title: row.title,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Body of `POST /resumes`; the body itself may be omitted.
#[derive(Debug, Default, Deserialize)]
pub struct CreateResumeRequest {
    pub title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateResumeRequest {
    pub title: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub id: Uuid,
}
