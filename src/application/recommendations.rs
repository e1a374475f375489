use std::time::Instant;

use metrics::{counter, histogram};
use tracing::{debug, warn};

use crate::application::engagement::EngagementService;
use crate::application::error::AppError;
use crate::domain::engagement::EnrichedPost;
use crate::domain::recommendations::{
    self, RecommendationOptions, RecommendationRequest, ScoredPost,
};

#[derive(Clone)]
pub struct RecommendationService {
    engagement: EngagementService,
    options: RecommendationOptions,
    draft_previews: bool,
}

impl RecommendationService {
    pub fn new(engagement: EngagementService, options: RecommendationOptions) -> Self {
        Self {
            engagement,
            options,
            draft_previews: false,
        }
    }

    /// Allow drafts as the post being read. Off by default so public callers
    /// cannot discover unpublished slugs.
    pub fn with_draft_previews(mut self, enabled: bool) -> Self {
        self.draft_previews = enabled;
        self
    }

    pub fn options(&self) -> RecommendationOptions {
        self.options
    }

    /// Scored recommendations for the reader of `slug`.
    ///
    /// The current post must be published unless draft previews are enabled.
    /// Candidates are always drawn from published posts only.
    pub async fn related_scored(&self, slug: &str) -> Result<Vec<ScoredPost>, AppError> {
        let started = Instant::now();
        let current = self
            .engagement
            .posts()
            .find_by_slug(slug)
            .await?
            .filter(|post| self.draft_previews || !post.draft)
            .ok_or(AppError::NotFound)?;

        let candidates = self
            .engagement
            .list(false)
            .await?
            .into_iter()
            .filter(|candidate| candidate.slug() != current.slug)
            .collect();

        let ranked = recommendations::rank(RecommendationRequest {
            current_slug: current.slug,
            current_keywords: current.keywords,
            candidates,
            options: self.options,
        });

        counter!("folio_recommendations_served_total").increment(1);
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        histogram!("folio_recommendation_rank_ms").record(elapsed_ms);
        debug!(slug, count = ranked.len(), "ranked related posts");
        Ok(ranked)
    }

    pub async fn related(&self, slug: &str) -> Result<Vec<EnrichedPost>, AppError> {
        let ranked = self.related_scored(slug).await?;
        Ok(ranked.into_iter().map(|scored| scored.post).collect())
    }

    /// Like [`Self::related`], but any failure other than an unknown slug
    /// yields an empty list so a post page never fails on recommendations.
    pub async fn related_or_empty(&self, slug: &str) -> Result<Vec<EnrichedPost>, AppError> {
        match self.related(slug).await {
            Ok(posts) => Ok(posts),
            Err(AppError::NotFound) => Err(AppError::NotFound),
            Err(err) => {
                warn!(slug, error = %err, "related posts unavailable");
                Ok(Vec::new())
            }
        }
    }
}
