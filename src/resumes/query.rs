use std::cmp::Ordering;

use uuid::Uuid;

use super::repo_types::Resume;
use crate::listing::{contains_ci, Listing, Paging, Sort, SortColumn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeColumn {
    Title,
    CreatedAt,
    UpdatedAt,
}

impl SortColumn for ResumeColumn {
    const ALL: &'static [Self] = &[
        ResumeColumn::Title,
        ResumeColumn::CreatedAt,
        ResumeColumn::UpdatedAt,
    ];

    fn name(self) -> &'static str {
        match self {
            ResumeColumn::Title => "title",
            ResumeColumn::CreatedAt => "created_at",
            ResumeColumn::UpdatedAt => "updated_at",
        }
    }

    fn expr(self) -> &'static str {
        self.name()
    }
}

pub type ResumeSort = Sort<ResumeColumn>;

pub fn default_sort() -> ResumeSort {
    Sort::desc(ResumeColumn::CreatedAt)
}

#[derive(Debug, Clone)]
pub struct ResumeQuery {
    pub owner: Uuid,
    pub paging: Paging,
    pub sort: ResumeSort,
    pub title: Option<String>,
}

impl ResumeQuery {
    pub fn new(owner: Uuid) -> Self {
        Self {
            owner,
            paging: Paging::default(),
            sort: default_sort(),
            title: None,
        }
    }

    pub fn matches(&self, row: &Resume) -> bool {
        row.user_id == self.owner
            && self
                .title
                .as_deref()
                .map_or(true, |term| contains_ci(&row.title, term))
    }

    pub fn compare(&self, a: &Resume, b: &Resume) -> Ordering {
        let primary = match self.sort.column {
            ResumeColumn::Title => a.title.cmp(&b.title),
            ResumeColumn::CreatedAt => a.created_at.cmp(&b.created_at),
            ResumeColumn::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        };
        self.sort
            .orient(primary)
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id))
    }

    pub fn evaluate<'a, I>(&self, rows: I) -> Listing<Resume>
    where
        I: IntoIterator<Item = &'a Resume>,
    {
        let mut matched: Vec<Resume> =
            rows.into_iter().filter(|r| self.matches(r)).cloned().collect();
        matched.sort_by(|a, b| self.compare(a, b));
        Listing {
            total: matched.len() as i64,
            rows: self.paging.window(&matched),
        }
    }
}
