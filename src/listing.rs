//! Shared pieces of the list endpoints: paging, sort tokens and the page body.

use std::cmp::Ordering;

use serde::Serialize;

use crate::error::AppError;

pub const DEFAULT_PAGE_SIZE: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// A column that a list endpoint may be ordered by.
pub trait SortColumn: Copy + Eq + Sized + 'static {
    /// Every sortable column, in the order the SQL flag table expects.
    const ALL: &'static [Self];

    fn name(self) -> &'static str;

    /// SQL expression the column sorts by.
    fn expr(self) -> &'static str;
}

/// One sort token: a column plus a direction (`-` prefix means descending).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort<C> {
    pub column: C,
    pub direction: Direction,
}

impl<C: SortColumn> Sort<C> {
    pub fn asc(column: C) -> Self {
        Self { column, direction: Direction::Asc }
    }

    pub fn desc(column: C) -> Self {
        Self { column, direction: Direction::Desc }
    }

    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let (name, build): (&str, fn(C) -> Self) = match raw.strip_prefix('-') {
            Some(rest) => (rest, Self::desc),
            None => (raw, Self::asc),
        };
        C::ALL
            .iter()
            .copied()
            .find(|c| c.name() == name)
            .map(build)
            .ok_or_else(|| {
                AppError::validation(format!(
                    "sort must be one of [{}]",
                    Self::tokens().join(" ")
                ))
            })
    }

    /// Every accepted token, ascending before descending for each column.
    pub fn tokens() -> Vec<String> {
        C::ALL
            .iter()
            .flat_map(|c| [c.name().to_string(), format!("-{}", c.name())])
            .collect()
    }

    pub fn token(self) -> String {
        match self.direction {
            Direction::Asc => self.column.name().to_string(),
            Direction::Desc => format!("-{}", self.column.name()),
        }
    }

    /// One boolean per token, in `tokens()` order; exactly one is set.
    pub fn flags(self) -> Vec<bool> {
        C::ALL
            .iter()
            .flat_map(|&c| {
                [
                    c == self.column && self.direction == Direction::Asc,
                    c == self.column && self.direction == Direction::Desc,
                ]
            })
            .collect()
    }

    /// Turns an ascending comparison into this token's direction.
    pub fn orient(self, ascending: Ordering) -> Ordering {
        match self.direction {
            Direction::Asc => ascending,
            Direction::Desc => ascending.reverse(),
        }
    }
}

/// Chained `CASE WHEN $n THEN expr END ASC|DESC` terms, one per sort token,
/// followed by the `created_at, id` tie-break. Flags bind from `first_param`.
pub fn order_by_clause<C: SortColumn>(first_param: usize) -> String {
    let mut terms = Vec::with_capacity(C::ALL.len() * 2 + 2);
    let mut param = first_param;
    for column in C::ALL {
        for direction in ["ASC", "DESC"] {
            terms.push(format!(
                "CASE WHEN ${param} THEN {} END {direction}",
                column.expr()
            ));
            param += 1;
        }
    }
    terms.push("created_at ASC".into());
    terms.push("id ASC".into());
    terms.join(",\n         ")
}

/// Page selection taken from `page` / `size` query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub page: i64,
    pub size: i64,
}

impl Default for Paging {
    fn default() -> Self {
        Self { page: 0, size: DEFAULT_PAGE_SIZE }
    }
}

impl Paging {
    pub fn new(page: Option<i64>, size: Option<i64>) -> Result<Self, AppError> {
        let page = page.unwrap_or(0);
        let size = size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page < 0 {
            return Err(AppError::validation("page must be greater than or equal to 0"));
        }
        if size < 0 {
            return Err(AppError::validation("size must be greater than or equal to 0"));
        }
        Ok(Self { page, size })
    }

    pub fn limit(&self) -> i64 {
        self.size
    }

    pub fn offset(&self) -> i64 {
        self.page.saturating_mul(self.size)
    }

    /// Applies limit/offset to an already ordered slice.
    pub fn window<T: Clone>(&self, rows: &[T]) -> Vec<T> {
        let offset = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(self.limit()).unwrap_or(usize::MAX);
        rows.iter().skip(offset).take(limit).cloned().collect()
    }
}

/// Rows of one page plus the filtered total before paging.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing<T> {
    pub rows: Vec<T>,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct PageBody<T> {
    pub page: i64,
    pub size: i64,
    pub total: i64,
    pub data: Vec<T>,
}

impl<T> PageBody<T> {
    pub fn new<R>(paging: Paging, listing: Listing<R>) -> Self
    where
        T: From<R>,
    {
        Self {
            page: paging.page,
            size: paging.size,
            total: listing.total,
            data: listing.rows.into_iter().map(T::from).collect(),
        }
    }
}

/// Treats absent and blank filter values the same way: no filter.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// `ILIKE` pattern matching `term` as a literal substring.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

/// Case-insensitive substring test, the in-process twin of `like_pattern`.
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
