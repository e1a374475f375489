//! Post metadata as authored in frontmatter, and the rules derived from it.

use std::{cmp::Ordering, collections::BTreeSet};

use serde::{Deserialize, Serialize};
use time::{
    Date, OffsetDateTime, PrimitiveDateTime, UtcOffset,
    format_description::{FormatItem, well_known::Rfc3339},
    macros::format_description,
};

pub const CALENDAR_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

const LOCAL_DATETIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

/// Reading speed used when a post does not declare its own reading time.
pub const WORDS_PER_MINUTE: usize = 200;

/// A set of topical tags. Order is irrelevant and duplicates collapse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Keywords(BTreeSet<String>);

impl Keywords {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            values
                .into_iter()
                .map(|value| value.as_ref().trim().to_string())
                .filter(|value| !value.is_empty())
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.0.contains(keyword)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of keywords present in both sets.
    pub fn overlap(&self, other: &Keywords) -> usize {
        self.0.intersection(&other.0).count()
    }
}

impl From<Vec<String>> for Keywords {
    fn from(values: Vec<String>) -> Self {
        Self::new(values)
    }
}

impl From<Keywords> for Vec<String> {
    fn from(keywords: Keywords) -> Self {
        keywords.0.into_iter().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostMetadata {
    pub slug: String,
    pub title: String,
    /// Publication date exactly as authored; see [`parse_post_date`].
    pub date: String,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: Keywords,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub author_url: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    /// Minutes, always at least one.
    pub reading_time: u32,
}

impl PostMetadata {
    pub fn published_on(&self) -> Option<Date> {
        parse_post_date(&self.date)
    }

    pub fn is_newsletter(&self) -> bool {
        is_newsletter_title(&self.title)
    }
}

/// Parse an authored post date.
///
/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps (converted to UTC) and local
/// `YYYY-MM-DDTHH:MM:SS` timestamps (taken at face value).
pub fn parse_post_date(value: &str) -> Option<Date> {
    let value = value.trim();
    if let Ok(date) = Date::parse(value, CALENDAR_DATE_FORMAT) {
        return Some(date);
    }
    if let Ok(timestamp) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(timestamp.to_offset(UtcOffset::UTC).date());
    }

    PrimitiveDateTime::parse(value, LOCAL_DATETIME_FORMAT)
        .ok()
        .map(|timestamp| timestamp.date())
}

/// Newsletter issues are titled with their bare issue date, e.g. `2024-01-01`.
///
/// Only the exact `dddd-dd-dd` shape qualifies; titles that merely contain a
/// date do not.
pub fn is_newsletter_title(title: &str) -> bool {
    let bytes = title.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(index, byte)| match index {
            4 | 7 => *byte == b'-',
            _ => byte.is_ascii_digit(),
        })
}

pub fn reading_time_minutes(body: &str) -> u32 {
    let words = body.split_whitespace().count();
    let minutes = words.div_ceil(WORDS_PER_MINUTE).max(1);
    u32::try_from(minutes).unwrap_or(u32::MAX)
}

/// Listing order: newest first, undated posts last, slug as the final key.
pub fn sort_newest_first(posts: &mut [PostMetadata]) {
    posts.sort_by(|left, right| {
        match (left.published_on(), right.published_on()) {
            (Some(l), Some(r)) => r.cmp(&l),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
        .then_with(|| left.slug.cmp(&right.slug))
    });
}

#[cfg(test)]
pub(crate) fn sample_post(slug: &str, title: &str, date: &str, keywords: &[&str]) -> PostMetadata {
    PostMetadata {
        slug: slug.to_string(),
        title: title.to_string(),
        date: date.to_string(),
        draft: false,
        description: String::new(),
        keywords: Keywords::new(keywords),
        author: None,
        author_url: None,
        image: None,
        reading_time: 1,
    }
}
