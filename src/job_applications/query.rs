//! List engine for job applications: filter predicates, the sort-token table
//! and the in-process evaluation used by the memory store.

use std::cmp::Ordering;

use time::{Date, UtcOffset};
use uuid::Uuid;

use super::repo_types::{JobApplication, Status};
use crate::listing::{contains_ci, Listing, Paging, Sort, SortColumn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobColumn {
    CompanyName,
    JobTitle,
    DateApplied,
    Status,
    Salary,
    IsReplied,
}

impl SortColumn for JobColumn {
    const ALL: &'static [Self] = &[
        JobColumn::CompanyName,
        JobColumn::JobTitle,
        JobColumn::DateApplied,
        JobColumn::Status,
        JobColumn::Salary,
        JobColumn::IsReplied,
    ];

    fn name(self) -> &'static str {
        match self {
            JobColumn::CompanyName => "company_name",
            JobColumn::JobTitle => "job_title",
            JobColumn::DateApplied => "date_applied",
            JobColumn::Status => "status",
            JobColumn::Salary => "salary",
            JobColumn::IsReplied => "is_replied",
        }
    }

    fn expr(self) -> &'static str {
        match self {
            JobColumn::Salary => "greatest(min_salary, max_salary)",
            other => other.name(),
        }
    }
}

pub type JobSort = Sort<JobColumn>;

pub fn default_sort() -> JobSort {
    Sort::desc(JobColumn::DateApplied)
}

/// Validated list request; every filter is optional and `None` matches all rows.
#[derive(Debug, Clone)]
pub struct JobApplicationQuery {
    pub owner: Uuid,
    pub paging: Paging,
    pub sort: JobSort,
    pub company_name_or_job_title: Option<String>,
    pub date_applied: Option<Date>,
    pub status: Option<Status>,
    /// Offset at which stored timestamps are reduced to calendar dates.
    pub date_offset: UtcOffset,
}

impl JobApplicationQuery {
    pub fn new(owner: Uuid, date_offset: UtcOffset) -> Self {
        Self {
            owner,
            paging: Paging::default(),
            sort: default_sort(),
            company_name_or_job_title: None,
            date_applied: None,
            status: None,
            date_offset,
        }
    }

    pub fn matches(&self, row: &JobApplication) -> bool {
        if row.user_id != self.owner {
            return false;
        }
        if let Some(term) = &self.company_name_or_job_title {
            if !contains_ci(&row.company_name, term) && !contains_ci(&row.job_title, term) {
                return false;
            }
        }
        if let Some(date) = self.date_applied {
            if row.date_applied.to_offset(self.date_offset).date() != date {
                return false;
            }
        }
        if let Some(status) = self.status {
            if row.status != status {
                return false;
            }
        }
        true
    }

    /// Orders by the selected column, then by `created_at` and `id` ascending.
    pub fn compare(&self, a: &JobApplication, b: &JobApplication) -> Ordering {
        let primary = match self.sort.column {
            JobColumn::CompanyName => a.company_name.cmp(&b.company_name),
            JobColumn::JobTitle => a.job_title.cmp(&b.job_title),
            JobColumn::DateApplied => a.date_applied.cmp(&b.date_applied),
            JobColumn::Status => a.status.cmp(&b.status),
            JobColumn::Salary => nulls_last(a.salary_key(), b.salary_key()),
            JobColumn::IsReplied => a.is_replied.cmp(&b.is_replied),
        };
        self.sort
            .orient(primary)
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id))
    }

    /// Scope, filter, order, count and page a set of rows.
    pub fn evaluate<'a, I>(&self, rows: I) -> Listing<JobApplication>
    where
        I: IntoIterator<Item = &'a JobApplication>,
    {
        let mut matched: Vec<JobApplication> =
            rows.into_iter().filter(|r| self.matches(r)).cloned().collect();
        matched.sort_by(|a, b| self.compare(a, b));
        Listing {
            total: matched.len() as i64,
            rows: self.paging.window(&matched),
        }
    }
}

/// Ascending comparison that places missing values after present ones.
fn nulls_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
