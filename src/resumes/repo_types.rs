use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Resume {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

const UNTITLED: &str = "Untitled ";

/// Next free default title: one past the largest `k` among titles of the
/// exact form `Untitled k`.
pub fn next_untitled<'a, I>(existing: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let highest = existing
        .into_iter()
        .filter_map(|title| title.strip_prefix(UNTITLED))
        .filter(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|n| n.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    format!("{UNTITLED}{}", highest.saturating_add(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_default_title() {
        assert_eq!(next_untitled([]), "Untitled 1");
    }

    #[test]
    fn skips_past_the_highest_number() {
        assert_eq!(next_untitled(["Untitled 1", "Untitled 4", "CV"]), "Untitled 5");
    }

    #[test]
    fn ignores_lookalike_titles() {
        let titles = ["Untitled", "Untitled x", "untitled 7", "Untitled 2 copy", "Untitled -3"];
        assert_eq!(next_untitled(titles), "Untitled 1");
    }
}
