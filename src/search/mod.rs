//! Search filters and the compiler that turns them into a query plan.
//!
//! A plan has two stages. The primary stage is a list of predicates that
//! SQLite can evaluate on the `notes` table (date range, content substring),
//! joined with AND and bound as parameters. The membership stage runs per
//! candidate note after its tags are read from the tag index.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use rusqlite::types::Value;

use crate::entity::Note;
use crate::error::{Result, ShortFormError};

/// Inclusive time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// Local midnight up to `now`.
    pub fn today<Tz: TimeZone>(now: &DateTime<Tz>) -> Result<Self> {
        let start = start_of_day(now, now.date_naive())?;
        Ok(Self::new(start, now.with_timezone(&Utc)))
    }

    /// The whole previous local day, 00:00:00 through 23:59:59.
    pub fn yesterday<Tz: TimeZone>(now: &DateTime<Tz>) -> Result<Self> {
        let day = now.date_naive() - Duration::days(1);
        let start = start_of_day(now, day)?;
        Ok(Self::new(start, start + Duration::seconds(86_399)))
    }

    /// `Nd` means the last N days up to `now`.
    pub fn from_age(age: &str, now: DateTime<Utc>) -> Result<Self> {
        let lowered = age.trim().to_lowercase();
        let days = lowered
            .strip_suffix('d')
            .filter(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
            .and_then(|n| n.parse::<i64>().ok())
            .ok_or_else(|| ShortFormError::InvalidAge(age.to_string()))?;
        let from = Duration::try_days(days)
            .and_then(|span| now.checked_sub_signed(span))
            .ok_or_else(|| ShortFormError::InvalidAge(age.to_string()))?;

        Ok(Self::new(from, now))
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from <= at && at <= self.to
    }
}

fn start_of_day<Tz: TimeZone>(now: &DateTime<Tz>, day: NaiveDate) -> Result<DateTime<Utc>> {
    let midnight = day
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| ShortFormError::InvalidDate(day.to_string()))?;
    now.timezone()
        .from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| ShortFormError::InvalidDate(day.to_string()))
}

/// Optional search criteria. All empty means "list everything".
#[derive(Debug, Default, Clone)]
pub struct SearchFilter {
    pub date_range: Option<DateRange>,
    /// Notes must carry every one of these tags.
    pub tags: BTreeSet<String>,
    /// Substring the content must contain.
    pub content: Option<String>,
    /// Loose catch-all: matches a tag OR a content substring. When set, it
    /// replaces `tags` and `content` entirely.
    pub term: Option<String>,
    pub ignore_case: bool,
}

impl SearchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = tags.into_iter().map(|t| t.as_ref().to_lowercase()).collect();
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_term(mut self, term: impl Into<String>) -> Self {
        self.term = Some(term.into());
        self
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    pub fn ignoring_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    /// Check if filter has any constraints.
    pub fn is_empty(&self) -> bool {
        self.date_range.is_none()
            && self.tags.is_empty()
            && non_blank(&self.content).is_none()
            && non_blank(&self.term).is_none()
    }
}

/// The value as given, unless it is only whitespace.
fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// A single typed constraint on a note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    TimestampBetween(DateRange),
    ContentContains { needle: String, ignore_case: bool },
    HasAllTags(BTreeSet<String>),
    AnyOf(Vec<Predicate>),
}

impl Predicate {
    /// Whether this predicate needs the tag index to be evaluated.
    pub fn needs_tags(&self) -> bool {
        match self {
            Predicate::TimestampBetween(_) | Predicate::ContentContains { .. } => false,
            Predicate::HasAllTags(_) => true,
            Predicate::AnyOf(preds) => preds.iter().any(Predicate::needs_tags),
        }
    }

    /// Evaluate against a note whose tags have been loaded. Secure notes
    /// hold ciphertext, so content predicates never match them.
    pub fn matches(&self, note: &Note) -> bool {
        match self {
            Predicate::TimestampBetween(range) => range.contains(note.created_at),
            Predicate::ContentContains {
                needle,
                ignore_case,
            } => {
                if note.secure {
                    false
                } else if *ignore_case {
                    note.content
                        .to_ascii_lowercase()
                        .contains(&needle.to_ascii_lowercase())
                } else {
                    note.content.contains(needle.as_str())
                }
            }
            Predicate::HasAllTags(tags) => tags.iter().all(|t| note.tags.contains(t)),
            Predicate::AnyOf(preds) => preds.iter().any(|p| p.matches(note)),
        }
    }

    /// Render as a SQL condition over the `notes` table, pushing bound values.
    /// Returns `None` for predicates that need the tag index.
    fn to_sql(&self, params: &mut Vec<Value>) -> Option<String> {
        match self {
            Predicate::TimestampBetween(range) => {
                params.push(Value::Integer(range.from.timestamp()));
                params.push(Value::Integer(range.to.timestamp()));
                Some("notes.timestamp BETWEEN ? AND ?".to_string())
            }
            Predicate::ContentContains {
                needle,
                ignore_case,
            } => {
                params.push(Value::Text(needle.clone()));
                if *ignore_case {
                    Some("(notes.secure = 0 AND instr(lower(notes.content), lower(?)) > 0)".to_string())
                } else {
                    Some("(notes.secure = 0 AND instr(notes.content, ?) > 0)".to_string())
                }
            }
            Predicate::HasAllTags(_) => None,
            Predicate::AnyOf(preds) => {
                if self.needs_tags() {
                    return None;
                }
                let parts: Vec<String> = preds.iter().filter_map(|p| p.to_sql(params)).collect();
                Some(format!("({})", parts.join(" OR ")))
            }
        }
    }
}

/// Output of [`compile`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPlan {
    /// Narrowing predicates evaluated by SQLite, joined with AND.
    pub primary: Vec<Predicate>,
    /// Evaluated per candidate note once its tags are loaded.
    pub membership: Option<Predicate>,
}

impl QueryPlan {
    /// The WHERE clause (empty when unconstrained) and its bound values.
    pub fn where_clause(&self) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let parts: Vec<String> = self
            .primary
            .iter()
            .filter_map(|p| p.to_sql(&mut params))
            .collect();

        if parts.is_empty() {
            (String::new(), params)
        } else {
            (format!("WHERE {}", parts.join(" AND ")), params)
        }
    }

    pub fn accepts(&self, note: &Note) -> bool {
        self.membership.as_ref().map_or(true, |p| p.matches(note))
    }
}

/// Compile a filter into a two-stage plan.
///
/// With a free-text term, tags and content are ignored and replaced by
/// "term is one of the tags OR content contains term". Otherwise every tag is
/// required and the content substring is required. The date range always
/// applies.
pub fn compile(filter: &SearchFilter) -> QueryPlan {
    let mut plan = QueryPlan::default();

    if let Some(range) = filter.date_range {
        plan.primary.push(Predicate::TimestampBetween(range));
    }

    if let Some(term) = non_blank(&filter.term) {
        let tag = if filter.ignore_case {
            term.to_lowercase()
        } else {
            term.to_string()
        };
        plan.membership = Some(Predicate::AnyOf(vec![
            Predicate::HasAllTags(BTreeSet::from([tag])),
            Predicate::ContentContains {
                needle: term.to_string(),
                ignore_case: filter.ignore_case,
            },
        ]));
        return plan;
    }

    if let Some(content) = non_blank(&filter.content) {
        plan.primary.push(Predicate::ContentContains {
            needle: content.to_string(),
            ignore_case: filter.ignore_case,
        });
    }

    if !filter.tags.is_empty() {
        plan.membership = Some(Predicate::HasAllTags(filter.tags.clone()));
    }

    plan
}

/// Split a `a, b,C` tag list into a trimmed, lower-cased, de-duplicated set.
pub fn parse_tags(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Parse a date string into DateTime<Utc>.
/// Supports ISO 8601 date format (YYYY-MM-DD) or full datetime. A bare date
/// resolves to midnight, or to 23:59:59 when `end_of_day` is set.
pub fn parse_date(s: &str, end_of_day: bool) -> Result<DateTime<Utc>> {
    // Try full datetime first
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| ShortFormError::InvalidDate(s.to_string()))?;
    let time = if end_of_day {
        NaiveTime::from_hms_opt(23, 59, 59)
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)
    }
    .ok_or_else(|| ShortFormError::InvalidDate(s.to_string()))?;

    Ok(DateTime::from_naive_utc_and_offset(date.and_time(time), Utc))
}
