use tracing::{debug, info};
use uuid::Uuid;

use super::dto::{
    CreateResumeRequest, DeletedResponse, ResumeEntry, ResumesParams, UpdateResumeRequest,
};
use super::query::{default_sort, ResumeQuery};
use crate::error::{AppError, AppResult};
use crate::listing::{non_blank, PageBody, Paging, Sort};
use crate::state::AppState;

fn not_found() -> AppError {
    AppError::not_found("resume not found")
}

pub fn build_query(owner: Uuid, params: ResumesParams) -> AppResult<ResumeQuery> {
    let mut query = ResumeQuery::new(owner);
    query.paging = Paging::new(params.page, params.size)?;
    query.sort = match non_blank(params.sort) {
        Some(raw) => Sort::parse(&raw)?,
        None => default_sort(),
    };
    query.title = non_blank(params.title);
    Ok(query)
}

pub async fn list(
    state: &AppState,
    owner: Uuid,
    params: ResumesParams,
) -> AppResult<PageBody<ResumeEntry>> {
    let query = build_query(owner, params)?;
    let listing = state.repo.list_resumes(&query).await?;
    debug!(%owner, sort = %query.sort.token(), total = listing.total, "resumes listed");
    Ok(PageBody::new(query.paging, listing))
}

pub async fn get(state: &AppState, owner: Uuid, id: Uuid) -> AppResult<ResumeEntry> {
    state
        .repo
        .find_resume(owner, id)
        .await?
        .map(ResumeEntry::from)
        .ok_or_else(not_found)
}

/// A blank or missing title falls back to the next `Untitled N`.
pub async fn create(
    state: &AppState,
    owner: Uuid,
    body: CreateResumeRequest,
) -> AppResult<ResumeEntry> {
    let row = state.repo.create_resume(owner, non_blank(body.title)).await?;
    info!(%owner, id = %row.id, title = %row.title, "resume created");
    Ok(row.into())
}

pub async fn update(
    state: &AppState,
    owner: Uuid,
    id: Uuid,
    body: UpdateResumeRequest,
) -> AppResult<ResumeEntry> {
    let title = match body.title {
        Some(raw) => Some(
            non_blank(Some(raw)).ok_or_else(|| AppError::validation("title must not be empty"))?,
        ),
        None => None,
    };
    let row = state
        .repo
        .update_resume(owner, id, title)
        .await?
        .ok_or_else(not_found)?;
    info!(%owner, %id, "resume updated");
    Ok(row.into())
}

pub async fn delete(state: &AppState, owner: Uuid, id: Uuid) -> AppResult<DeletedResponse> {
    let id = state
        .repo
        .delete_resume(owner, id)
        .await?
        .ok_or_else(not_found)?;
    info!(%owner, %id, "resume deleted");
    Ok(DeletedResponse { id })
}
