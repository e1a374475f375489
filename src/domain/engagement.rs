//! Engagement aggregation: merge static post metadata with view counters.

use std::collections::HashMap;

use serde::Serialize;
use time::{Date, OffsetDateTime};

use crate::domain::posts::PostMetadata;

/// A post together with its current view count. Recomputed per request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedPost {
    #[serde(flatten)]
    pub post: PostMetadata,
    pub views: u64,
    pub views_per_day: f64,
}

impl EnrichedPost {
    pub fn slug(&self) -> &str {
        &self.post.slug
    }
}

/// Whole days between publication and `now`, never less than one.
///
/// An unknown publication date counts as published `now`.
pub fn days_since(published: Option<Date>, now: OffsetDateTime) -> u64 {
    let Some(published) = published else {
        return 1;
    };

    let elapsed = now - published.midnight().assume_utc();
    let days = elapsed.whole_days();
    u64::try_from(days).unwrap_or(0).max(1)
}

pub fn enrich_post(post: PostMetadata, views: u64, now: OffsetDateTime) -> EnrichedPost {
    let days = days_since(post.published_on(), now);
    let views_per_day = views as f64 / days as f64;

    EnrichedPost {
        post,
        views,
        views_per_day,
    }
}

/// Enrich every post; slugs missing from `counters` have zero views.
pub fn enrich<I>(
    posts: I,
    counters: &HashMap<String, u64>,
    now: OffsetDateTime,
) -> Vec<EnrichedPost>
where
    I: IntoIterator<Item = PostMetadata>,
{
    posts
        .into_iter()
        .map(|post| {
            let views = counters.get(&post.slug).copied().unwrap_or(0);
            enrich_post(post, views, now)
        })
        .collect()
}

/// Order by views per day, most popular first; slug breaks ties.
pub fn sort_by_popularity(posts: &mut [EnrichedPost]) {
    posts.sort_by(|left, right| {
        right
            .views_per_day
            .total_cmp(&left.views_per_day)
            .then_with(|| left.slug().cmp(right.slug()))
    });
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime};

    use super::*;
    use crate::domain::posts::sample_post;

    const NOW: OffsetDateTime = datetime!(2024-06-11 12:00 UTC);

    #[test]
    fn days_since_floors_partial_days() {
        assert_eq!(days_since(Some(date!(2024 - 06 - 01)), NOW), 10);
        assert_eq!(days_since(Some(date!(2024 - 06 - 10)), NOW), 1);
    }

    #[test]
    fn days_since_has_a_one_day_floor() {
        assert_eq!(days_since(Some(date!(2024 - 06 - 11)), NOW), 1);
        assert_eq!(days_since(Some(date!(2025 - 01 - 01)), NOW), 1);
        assert_eq!(days_since(None, NOW), 1);
    }

    #[test]
    fn enrich_derives_views_per_day() {
        let posts = vec![
            sample_post("a", "A", "2024-06-01", &["ai"]),
            sample_post("c", "C", "2024-03-03", &["cooking"]),
        ];
        let counters = HashMap::from([("a".to_string(), 100), ("c".to_string(), 1000)]);

        let enriched = enrich(posts, &counters, NOW);

        assert_eq!(enriched[0].views, 100);
        assert_eq!(enriched[0].views_per_day, 10.0);
        assert_eq!(enriched[1].views, 1000);
        assert_eq!(enriched[1].views_per_day, 10.0);
    }

    #[test]
    fn missing_counters_mean_zero_views() {
        let posts = vec![sample_post("quiet", "Quiet", "2024-06-01", &[])];
        let enriched = enrich(posts, &HashMap::new(), NOW);

        assert_eq!(enriched[0].views, 0);
        assert_eq!(enriched[0].views_per_day, 0.0);
    }

    #[test]
    fn malformed_dates_are_treated_as_published_now() {
        let posts = vec![sample_post("odd", "Odd", "not a date", &[])];
        let counters = HashMap::from([("odd".to_string(), 7)]);

        let enriched = enrich(posts, &counters, NOW);

        assert_eq!(enriched[0].views_per_day, 7.0);
    }

    #[test]
    fn enrich_accepts_an_empty_corpus() {
        assert!(enrich(Vec::new(), &HashMap::new(), NOW).is_empty());
    }

    #[test]
    fn popularity_sort_uses_slug_for_ties() {
        let counters = HashMap::from([
            ("b".to_string(), 5),
            ("a".to_string(), 5),
            ("z".to_string(), 50),
        ]);
        let posts = vec![
            sample_post("b", "B", "2024-06-10", &[]),
            sample_post("a", "A", "2024-06-10", &[]),
            sample_post("z", "Z", "2024-06-10", &[]),
        ];
        let mut enriched = enrich(posts, &counters, NOW);
        sort_by_popularity(&mut enriched);

        let slugs: Vec<_> = enriched.iter().map(EnrichedPost::slug).collect();
        assert_eq!(slugs, ["z", "a", "b"]);
    }
}
