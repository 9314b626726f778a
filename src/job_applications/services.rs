use time::{macros::format_description, Date};
use tracing::{debug, info};
use uuid::Uuid;

use super::dto::{
    CreateJobApplicationRequest, DeletedResponse, JobApplicationDetails, JobApplicationEntry,
    JobApplicationsParams, UpdateJobApplicationRequest,
};
use super::query::{default_sort, JobApplicationQuery};
use super::repo_types::{JobApplicationChanges, NewJobApplication, Status};
use crate::error::{AppError, AppResult};
use crate::listing::{non_blank, PageBody, Paging, Sort};
use crate::state::AppState;

fn not_found() -> AppError {
    AppError::not_found("job application not found")
}

fn parse_date(raw: &str) -> AppResult<Date> {
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .map_err(|_| AppError::validation("date_applied must be a date formatted as YYYY-MM-DD"))
}

fn check_salary(field: &str, value: Option<f64>) -> AppResult<()> {
    match value {
        Some(v) if v < 0.0 || v.is_nan() => Err(AppError::validation(format!(
            "{field} must be greater than or equal to 0"
        ))),
        _ => Ok(()),
    }
}

fn required(field: &str, value: String) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Validates raw query parameters into an owner-scoped list request.
pub fn build_query(
    owner: Uuid,
    params: JobApplicationsParams,
    state: &AppState,
) -> AppResult<JobApplicationQuery> {
    let mut query = JobApplicationQuery::new(owner, state.config.date_filter_offset);
    query.paging = Paging::new(params.page, params.size)?;
    query.sort = match non_blank(params.sort) {
        Some(raw) => Sort::parse(&raw)?,
        None => default_sort(),
    };
    query.company_name_or_job_title = non_blank(params.company_name_or_job_title);
    query.date_applied = non_blank(params.date_applied)
        .map(|raw| parse_date(&raw))
        .transpose()?;
    query.status = non_blank(params.status)
        .map(|raw| Status::parse(&raw))
        .transpose()?;
    Ok(query)
}

pub async fn list(
    state: &AppState,
    owner: Uuid,
    params: JobApplicationsParams,
) -> AppResult<PageBody<JobApplicationEntry>> {
    let query = build_query(owner, params, state)?;
    let listing = state.repo.list_job_applications(&query).await?;
    debug!(%owner, sort = %query.sort.token(), total = listing.total, "job applications listed");
    Ok(PageBody::new(query.paging, listing))
}

pub async fn get(state: &AppState, owner: Uuid, id: Uuid) -> AppResult<JobApplicationDetails> {
    state
        .repo
        .find_job_application(owner, id)
        .await?
        .map(JobApplicationDetails::from)
        .ok_or_else(not_found)
}

pub async fn create(
    state: &AppState,
    owner: Uuid,
    body: CreateJobApplicationRequest,
) -> AppResult<JobApplicationDetails> {
    check_salary("minSalary", body.min_salary)?;
    check_salary("maxSalary", body.max_salary)?;
    let new = NewJobApplication {
        company_name: required("companyName", body.company_name)?,
        job_title: required("jobTitle", body.job_title)?,
        date_applied: body.date_applied,
        status: Status::parse(&body.status)?,
        min_salary: body.min_salary,
        max_salary: body.max_salary,
        job_posting_url: body.job_posting_url,
        notes: body.notes,
    };

    let row = state.repo.create_job_application(owner, new).await?;
    info!(%owner, id = %row.id, "job application created");
    Ok(row.into())
}

/// Sparse update: only the keys present in the body are written.
pub async fn update(
    state: &AppState,
    owner: Uuid,
    id: Uuid,
    body: UpdateJobApplicationRequest,
) -> AppResult<JobApplicationDetails> {
    check_salary("minSalary", body.min_salary)?;
    check_salary("maxSalary", body.max_salary)?;
    let changes = JobApplicationChanges {
        company_name: body.company_name,
        job_title: body.job_title,
        date_applied: body.date_applied,
        status: body.status.as_deref().map(Status::parse).transpose()?,
        is_replied: body.is_replied,
        min_salary: body.min_salary,
        max_salary: body.max_salary,
        job_posting_url: body.job_posting_url,
        notes: body.notes,
    };

    let row = state
        .repo
        .update_job_application(owner, id, &changes)
        .await?
        .ok_or_else(not_found)?;
    info!(%owner, %id, "job application updated");
    Ok(row.into())
}

pub async fn delete(state: &AppState, owner: Uuid, id: Uuid) -> AppResult<DeletedResponse> {
    let id = state
        .repo
        .delete_job_application(owner, id)
        .await?
        .ok_or_else(not_found)?;
    info!(%owner, %id, "job application deleted");
    Ok(DeletedResponse { id })
}
