//! Related-post ranking.
//!
//! Candidates are scored by a blend of keyword overlap with the post being
//! read and their popularity relative to the rest of the pool:
//!
//! ```text
//! score = (1 - view_count_weight) * keyword_score + view_count_weight * view_score
//! ```
//!
//! Selection walks the candidates in descending score order and skips
//! newsletter issues once their quota is spent, so a lower-scored ordinary
//! post can still take the slot.

use std::num::NonZeroUsize;

use serde::Serialize;

use crate::domain::{engagement::EnrichedPost, error::DomainError, posts::Keywords};

pub const DEFAULT_VIEW_COUNT_WEIGHT: f64 = 0.3;
pub const DEFAULT_MAX_RESULTS: NonZeroUsize = NonZeroUsize::new(4).unwrap();
pub const DEFAULT_MAX_NEWSLETTERS: usize = 1;

/// Validated ranking tunables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecommendationOptions {
    view_count_weight: f64,
    max_results: NonZeroUsize,
    max_newsletters: usize,
}

impl RecommendationOptions {
    pub fn new(
        view_count_weight: f64,
        max_results: usize,
        max_newsletters: usize,
    ) -> Result<Self, DomainError> {
        if !(0.0..=1.0).contains(&view_count_weight) {
            return Err(DomainError::validation(
                "view_count_weight",
                format!("must be within [0, 1], got {view_count_weight}"),
            ));
        }

        let max_results = NonZeroUsize::new(max_results)
            .ok_or_else(|| DomainError::validation("max_results", "must be greater than zero"))?;

        Ok(Self {
            view_count_weight,
            max_results,
            max_newsletters,
        })
    }

    pub fn view_count_weight(&self) -> f64 {
        self.view_count_weight
    }

    pub fn keyword_weight(&self) -> f64 {
        1.0 - self.view_count_weight
    }

    pub fn max_results(&self) -> usize {
        self.max_results.get()
    }

    pub fn max_newsletters(&self) -> usize {
        self.max_newsletters
    }
}

impl Default for RecommendationOptions {
    fn default() -> Self {
        Self {
            view_count_weight: DEFAULT_VIEW_COUNT_WEIGHT,
            max_results: DEFAULT_MAX_RESULTS,
            max_newsletters: DEFAULT_MAX_NEWSLETTERS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecommendationRequest {
    pub current_slug: String,
    pub current_keywords: Keywords,
    pub candidates: Vec<EnrichedPost>,
    pub options: RecommendationOptions,
}

/// A selected candidate with the components of its score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredPost {
    #[serde(flatten)]
    pub post: EnrichedPost,
    pub keyword_score: f64,
    pub view_score: f64,
    pub score: f64,
}

/// Shared keywords over the larger of the two set sizes.
pub fn keyword_score(candidate: &Keywords, current: &Keywords) -> f64 {
    let denominator = candidate.len().max(current.len());
    if denominator == 0 {
        return 0.0;
    }

    candidate.overlap(current) as f64 / denominator as f64
}

/// Views per day relative to the pool maximum.
pub fn view_score(views_per_day: f64, max_views_per_day: f64) -> f64 {
    if max_views_per_day > 0.0 {
        views_per_day / max_views_per_day
    } else {
        0.0
    }
}

/// Score, order and select candidates.
///
/// Ties on score fall back to views per day (descending), then slug
/// (ascending), so the output is fully deterministic.
pub fn rank(request: RecommendationRequest) -> Vec<ScoredPost> {
    let RecommendationRequest {
        current_slug,
        current_keywords,
        candidates,
        options,
    } = request;

    let pool: Vec<EnrichedPost> = candidates
        .into_iter()
        .filter(|candidate| candidate.slug() != current_slug)
        .collect();

    if pool.is_empty() {
        return Vec::new();
    }

    let max_views_per_day = pool
        .iter()
        .map(|candidate| candidate.views_per_day)
        .fold(0.0_f64, f64::max);

    let mut scored: Vec<ScoredPost> = pool
        .into_iter()
        .map(|post| {
            let keyword_score = keyword_score(&post.post.keywords, &current_keywords);
            let view_score = view_score(post.views_per_day, max_views_per_day);
            let score = options.keyword_weight() * keyword_score
                + options.view_count_weight() * view_score;
            ScoredPost {
                post,
                keyword_score,
                view_score,
                score,
            }
        })
        .collect();

    scored.sort_by(|left, right| {
        right
            .score
            .total_cmp(&left.score)
            .then_with(|| right.post.views_per_day.total_cmp(&left.post.views_per_day))
            .then_with(|| left.post.slug().cmp(right.post.slug()))
    });

    let mut selected = Vec::with_capacity(options.max_results());
    let mut newsletters = 0;
    for candidate in scored {
        if selected.len() == options.max_results() {
            break;
        }
        if candidate.post.post.is_newsletter() {
            if newsletters >= options.max_newsletters() {
                continue;
            }
            newsletters += 1;
        }
        selected.push(candidate);
    }

    selected
}

/// The recommendation list for a reader; empty means "show nothing".
pub fn recommend(request: RecommendationRequest) -> Vec<EnrichedPost> {
    rank(request)
        .into_iter()
        .map(|scored| scored.post)
        .collect()
}
