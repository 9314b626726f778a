//! Process-local store behind the same repository traits as PostgreSQL.
//! Used by the test suite and by `STORAGE=memory` dev runs.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::anyhow;
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo::{TokenRepo, UserRepo};
use crate::auth::repo_types::{IssuedToken, NewUser, User};
use crate::error::{AppError, AppResult};
use crate::job_applications::query::JobApplicationQuery;
use crate::job_applications::repo::JobApplicationRepo;
use crate::job_applications::repo_types::{
    JobApplication, JobApplicationChanges, NewJobApplication,
};
use crate::listing::Listing;
use crate::resumes::query::ResumeQuery;
use crate::resumes::repo::ResumeRepo;
use crate::resumes::repo_types::{next_untitled, Resume};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    verification_tokens: HashMap<Uuid, IssuedToken>,
    reset_tokens: HashMap<Uuid, IssuedToken>,
    job_applications: Vec<JobApplication>,
    resumes: Vec<Resume>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    fn tables(&self) -> AppResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| AppError::Internal(anyhow!("memory store lock poisoned")))
    }
}

fn duplicate_title() -> AppError {
    AppError::Conflict("resume with provided title already exists".into())
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn create_user(&self, user: NewUser, verification: IssuedToken) -> AppResult<User> {
        let mut t = self.tables()?;
        if t.users.values().any(|u| u.email == user.email) {
            return Err(AppError::Conflict(
                "user with provided email already exists".into(),
            ));
        }
        let now = OffsetDateTime::now_utc();
        let created = User {
            id: user.id,
            email: user.email,
            password_hash: user.password_hash,
            first_name: user.first_name,
            last_name: user.last_name,
            is_email_verified: false,
            created_at: now,
            updated_at: now,
        };
        t.users.insert(created.id, created.clone());
        t.verification_tokens.insert(
            created.id,
            IssuedToken { user_id: created.id, ..verification },
        );
        Ok(created)
    }

    async fn find_user_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.tables()?.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self
            .tables()?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn mark_email_verified(&self, id: Uuid) -> AppResult<Option<User>> {
        let mut t = self.tables()?;
        Ok(t.users.get_mut(&id).map(|user| {
            user.is_email_verified = true;
            user.updated_at = OffsetDateTime::now_utc();
            user.clone()
        }))
    }
}

#[async_trait]
impl TokenRepo for MemoryStore {
    async fn verification_token(&self, user_id: Uuid) -> AppResult<Option<IssuedToken>> {
        Ok(self.tables()?.verification_tokens.get(&user_id).cloned())
    }

    async fn replace_verification_token(
        &self,
        next: IssuedToken,
    ) -> AppResult<Option<IssuedToken>> {
        let mut t = self.tables()?;
        Ok(t.verification_tokens.get_mut(&next.user_id).map(|slot| {
            *slot = next;
            slot.clone()
        }))
    }

    async fn upsert_reset_token(&self, next: IssuedToken) -> AppResult<IssuedToken> {
        self.tables()?.reset_tokens.insert(next.user_id, next.clone());
        Ok(next)
    }

    async fn find_reset_token(&self, token: &str) -> AppResult<Option<IssuedToken>> {
        Ok(self
            .tables()?
            .reset_tokens
            .values()
            .find(|issued| issued.token == token)
            .cloned())
    }

    async fn consume_reset_token(&self, token: &str, password_hash: &str) -> AppResult<bool> {
        let mut t = self.tables()?;
        let Some(user_id) = t
            .reset_tokens
            .values()
            .find(|issued| issued.token == token)
            .map(|issued| issued.user_id)
        else {
            return Ok(false);
        };
        let Some(user) = t.users.get_mut(&user_id) else {
            return Err(AppError::not_found("user not found"));
        };
        user.password_hash = password_hash.to_string();
        user.updated_at = OffsetDateTime::now_utc();
        t.reset_tokens.remove(&user_id);
        Ok(true)
    }
}

#[async_trait]
impl JobApplicationRepo for MemoryStore {
    async fn list_job_applications(
        &self,
        query: &JobApplicationQuery,
    ) -> AppResult<Listing<JobApplication>> {
        Ok(query.evaluate(&self.tables()?.job_applications))
    }

    async fn find_job_application(
        &self,
        owner: Uuid,
        id: Uuid,
    ) -> AppResult<Option<JobApplication>> {
        Ok(self
            .tables()?
            .job_applications
            .iter()
            .find(|r| r.id == id && r.user_id == owner)
            .cloned())
    }

    async fn create_job_application(
        &self,
        owner: Uuid,
        new: NewJobApplication,
    ) -> AppResult<JobApplication> {
        let now = OffsetDateTime::now_utc();
        let row = JobApplication {
            id: Uuid::new_v4(),
            user_id: owner,
            company_name: new.company_name,
            job_title: new.job_title,
            date_applied: new.date_applied,
            status: new.status,
            is_replied: false,
            min_salary: new.min_salary,
            max_salary: new.max_salary,
            job_posting_url: new.job_posting_url,
            notes: new.notes,
            created_at: now,
            updated_at: now,
        };
        self.tables()?.job_applications.push(row.clone());
        Ok(row)
    }

    async fn update_job_application(
        &self,
        owner: Uuid,
        id: Uuid,
        changes: &JobApplicationChanges,
    ) -> AppResult<Option<JobApplication>> {
        let mut t = self.tables()?;
        Ok(t
            .job_applications
            .iter_mut()
            .find(|r| r.id == id && r.user_id == owner)
            .map(|row| {
                changes.apply_to(row);
                row.updated_at = OffsetDateTime::now_utc();
                row.clone()
            }))
    }

    async fn delete_job_application(&self, owner: Uuid, id: Uuid) -> AppResult<Option<Uuid>> {
        let mut t = self.tables()?;
        let before = t.job_applications.len();
        t.job_applications.retain(|r| !(r.id == id && r.user_id == owner));
        Ok((t.job_applications.len() < before).then_some(id))
    }
}

#[async_trait]
impl ResumeRepo for MemoryStore {
    async fn list_resumes(&self, query: &ResumeQuery) -> AppResult<Listing<Resume>> {
        Ok(query.evaluate(&self.tables()?.resumes))
    }

    async fn find_resume(&self, owner: Uuid, id: Uuid) -> AppResult<Option<Resume>> {
        Ok(self
            .tables()?
            .resumes
            .iter()
            .find(|r| r.id == id && r.user_id == owner)
            .cloned())
    }

    async fn create_resume(&self, owner: Uuid, title: Option<String>) -> AppResult<Resume> {
        let mut t = self.tables()?;
        let taken: Vec<&str> = t
            .resumes
            .iter()
            .filter(|r| r.user_id == owner)
            .map(|r| r.title.as_str())
            .collect();
        let title = match title {
            Some(title) => title,
            None => next_untitled(taken.iter().copied()),
        };
        if taken.contains(&title.as_str()) {
            return Err(duplicate_title());
        }

        let now = OffsetDateTime::now_utc();
        let row = Resume {
            id: Uuid::new_v4(),
            user_id: owner,
            title,
            created_at: now,
            updated_at: now,
        };
        t.resumes.push(row.clone());
        Ok(row)
    }

    async fn update_resume(
        &self,
        owner: Uuid,
        id: Uuid,
        title: Option<String>,
    ) -> AppResult<Option<Resume>> {
        let mut t = self.tables()?;
        if let Some(title) = &title {
            if t
                .resumes
                .iter()
                .any(|r| r.user_id == owner && r.id != id && &r.title == title)
            {
                return Err(duplicate_title());
            }
        }
        Ok(t
            .resumes
            .iter_mut()
            .find(|r| r.id == id && r.user_id == owner)
            .map(|row| {
                if let Some(title) = title {
                    row.title = title;
                }
                row.updated_at = OffsetDateTime::now_utc();
                row.clone()
            }))
    }

    async fn delete_resume(&self, owner: Uuid, id: Uuid) -> AppResult<Option<Uuid>> {
        let mut t = self.tables()?;
        let before = t.resumes.len();
        t.resumes.retain(|r| !(r.id == id && r.user_id == owner));
        Ok((t.resumes.len() < before).then_some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::tokens::{issue, RESET_TTL, VERIFICATION_TTL};

    async fn user(store: &MemoryStore, email: &str) -> User {
        let id = Uuid::new_v4();
        store
            .create_user(
                NewUser {
                    id,
                    email: email.into(),
                    password_hash: "old".into(),
                    first_name: "Ann".into(),
                    last_name: "Lee".into(),
                },
                issue(id, VERIFICATION_TTL, OffsetDateTime::now_utc()),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn email_lookup_is_exact() {
        let store = MemoryStore::default();
        user(&store, "Ann@Example.com").await;
        assert!(store.find_user_by_email("Ann@Example.com").await.unwrap().is_some());
        assert!(store.find_user_by_email("ann@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reset_token_upsert_keeps_one_row_per_user() {
        let store = MemoryStore::default();
        let u = user(&store, "ann@example.com").await;
        let first = store
            .upsert_reset_token(issue(u.id, RESET_TTL, OffsetDateTime::now_utc()))
            .await
            .unwrap();
        let second = store
            .upsert_reset_token(issue(u.id, RESET_TTL, OffsetDateTime::now_utc()))
            .await
            .unwrap();
        assert!(store.find_reset_token(&first.token).await.unwrap().is_none());
        assert_eq!(store.find_reset_token(&second.token).await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn consume_is_single_use() {
        let store = MemoryStore::default();
        let u = user(&store, "ann@example.com").await;
        let token = store
            .upsert_reset_token(issue(u.id, RESET_TTL, OffsetDateTime::now_utc()))
            .await
            .unwrap();
        assert!(store.consume_reset_token(&token.token, "new").await.unwrap());
        assert!(!store.consume_reset_token(&token.token, "newer").await.unwrap());
        let stored = store.find_user_by_id(u.id).await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "new");
    }

    #[tokio::test]
    async fn renaming_onto_a_taken_title_conflicts() {
        let store = MemoryStore::default();
        let owner = Uuid::new_v4();
        store.create_resume(owner, Some("A".into())).await.unwrap();
        let b = store.create_resume(owner, Some("B".into())).await.unwrap();
        let err = store.update_resume(owner, b.id, Some("A".into())).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        // Renaming to its own title is fine.
        assert!(store.update_resume(owner, b.id, Some("B".into())).await.unwrap().is_some());
    }
}
