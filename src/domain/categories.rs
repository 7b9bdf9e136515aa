//! Category rules that do not depend on storage: the published-post metric,
//! the posts-status lookups and the `created_at` date hierarchy.

use serde::{Deserialize, Serialize};
use time::{Date, Month, OffsetDateTime, UtcOffset};

use crate::domain::entities::PostRecord;
use crate::domain::error::DomainError;

/// Number of posts in `posts` that are published.
pub fn published_posts_count(posts: &[PostRecord]) -> u64 {
    posts.iter().filter(|post| post.is_published).count() as u64
}

/// Lookups offered by the "posts status" list filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostsStatus {
    /// At least one published post.
    Published,
    /// Has posts, none of them published.
    DraftOnly,
    /// No posts at all.
    Empty,
}

impl PostsStatus {
    pub const PARAMETER: &'static str = "posts_status";
    pub const TITLE: &'static str = "Posts status";
    pub const ALL: [PostsStatus; 3] = [
        PostsStatus::Published,
        PostsStatus::DraftOnly,
        PostsStatus::Empty,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PostsStatus::Published => "published",
            PostsStatus::DraftOnly => "draft_only",
            PostsStatus::Empty => "empty",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PostsStatus::Published => "With published posts",
            PostsStatus::DraftOnly => "Only unpublished posts",
            PostsStatus::Empty => "Without posts",
        }
    }

    /// Classify a category from its post totals.
    pub fn classify(total: u64, published: u64) -> Self {
        if published > 0 {
            PostsStatus::Published
        } else if total > 0 {
            PostsStatus::DraftOnly
        } else {
            PostsStatus::Empty
        }
    }
}

impl TryFrom<&str> for PostsStatus {
    type Error = DomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        PostsStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| DomainError::validation(format!("unknown posts status `{value}`")))
    }
}

/// Drill-down position inside the `created_at` date hierarchy. Every
/// variant but `All` is anchored on the first day it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateHierarchy {
    #[default]
    All,
    Year(Date),
    Month(Date),
    Day(Date),
}

/// Granularity of the buckets offered below a hierarchy position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateLevel {
    Year,
    Month,
    Day,
}

impl DateHierarchy {
    pub const MIN_YEAR: i32 = 1;
    pub const MAX_YEAR: i32 = 9999;

    /// Build a position from raw `year` / `month` / `day` parameters. A finer
    /// component requires all coarser ones.
    pub fn from_parts(
        year: Option<i32>,
        month: Option<u8>,
        day: Option<u8>,
    ) -> Result<Self, DomainError> {
        match (year, month, day) {
            (None, None, None) => Ok(DateHierarchy::All),
            (Some(year), None, None) => Ok(DateHierarchy::Year(first_day(year, Month::January)?)),
            (Some(year), Some(month), None) => {
                Ok(DateHierarchy::Month(first_day(year, parse_month(month)?)?))
            }
            (Some(year), Some(month), Some(day)) => {
                let date = first_day(year, parse_month(month)?)?
                    .replace_day(day)
                    .map_err(|err| DomainError::validation(format!("invalid date: {err}")))?;
                Ok(DateHierarchy::Day(date))
            }
            _ => Err(DomainError::validation(
                "date hierarchy requires year before month and month before day",
            )),
        }
    }

    /// Whether `at` falls inside this position, compared in UTC.
    pub fn contains(&self, at: OffsetDateTime) -> bool {
        let at = at.to_offset(UtcOffset::UTC);
        match *self {
            DateHierarchy::All => true,
            DateHierarchy::Year(start) => at.year() == start.year(),
            DateHierarchy::Month(start) => at.year() == start.year() && at.month() == start.month(),
            DateHierarchy::Day(date) => at.date() == date,
        }
    }

    /// Level of the buckets listed beneath this position; `None` at day level.
    pub fn next_level(&self) -> Option<DateLevel> {
        match self {
            DateHierarchy::All => Some(DateLevel::Year),
            DateHierarchy::Year(_) => Some(DateLevel::Month),
            DateHierarchy::Month(_) => Some(DateLevel::Day),
            DateHierarchy::Day(_) => None,
        }
    }

    /// Range `[start, end)` covered by this position, in UTC. `None` only for
    /// `All`; the end is open when the position reaches the last
    /// representable day.
    pub fn bounds(&self) -> Option<(OffsetDateTime, Option<OffsetDateTime>)> {
        let (start, end) = match *self {
            DateHierarchy::All => return None,
            DateHierarchy::Year(start) => (
                start,
                Date::from_calendar_date(start.year() + 1, Month::January, 1).ok(),
            ),
            DateHierarchy::Month(start) => {
                let end = match start.month() {
                    Month::December => {
                        Date::from_calendar_date(start.year() + 1, Month::January, 1).ok()
                    }
                    month => Date::from_calendar_date(start.year(), month.next(), 1).ok(),
                };
                (start, end)
            }
            DateHierarchy::Day(date) => (date, date.next_day()),
        };

        Some((
            start.midnight().assume_utc(),
            end.map(|end| end.midnight().assume_utc()),
        ))
    }
}

/// One navigable bucket of the date hierarchy with the number of categories in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateBucket {
    pub level: DateLevel,
    pub year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day: Option<u8>,
    pub count: u64,
}

impl DateBucket {
    /// Bucket for `date` at `level`.
    pub fn at(level: DateLevel, date: Date, count: u64) -> Self {
        let (month, day) = match level {
            DateLevel::Year => (None, None),
            DateLevel::Month => (Some(u8::from(date.month())), None),
            DateLevel::Day => (Some(u8::from(date.month())), Some(date.day())),
        };
        Self {
            level,
            year: date.year(),
            month,
            day,
            count,
        }
    }
}

fn first_day(year: i32, month: Month) -> Result<Date, DomainError> {
    if !(DateHierarchy::MIN_YEAR..=DateHierarchy::MAX_YEAR).contains(&year) {
        return Err(DomainError::validation(format!(
            "year `{year}` is outside {}..={}",
            DateHierarchy::MIN_YEAR,
            DateHierarchy::MAX_YEAR
        )));
    }
    Date::from_calendar_date(year, month, 1)
        .map_err(|err| DomainError::validation(format!("invalid date: {err}")))
}

fn parse_month(value: u8) -> Result<Month, DomainError> {
    Month::try_from(value).map_err(|_| DomainError::validation(format!("invalid month `{value}`")))
}
