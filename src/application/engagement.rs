use std::{collections::HashMap, sync::Arc};

use metrics::counter;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::application::error::AppError;
use crate::application::repos::{PostsRepo, ViewCountsRepo};
use crate::domain::engagement::{self, EnrichedPost};
use crate::domain::posts::PostMetadata;

pub type Clock = fn() -> OffsetDateTime;

/// Loads posts and their view counters and joins them into enriched posts.
#[derive(Clone)]
pub struct EngagementService {
    posts: Arc<dyn PostsRepo>,
    views: Arc<dyn ViewCountsRepo>,
    clock: Clock,
}

impl EngagementService {
    pub fn new(posts: Arc<dyn PostsRepo>, views: Arc<dyn ViewCountsRepo>) -> Self {
        Self {
            posts,
            views,
            clock: OffsetDateTime::now_utc,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn posts(&self) -> &Arc<dyn PostsRepo> {
        &self.posts
    }

    /// Enriched listing, newest first.
    pub async fn list(&self, include_drafts: bool) -> Result<Vec<EnrichedPost>, AppError> {
        let posts = self.posts.list_posts(include_drafts).await?;
        Ok(self.enrich(posts).await)
    }

    /// Enriched published posts ordered by views per day.
    pub async fn popular(&self, limit: usize) -> Result<Vec<EnrichedPost>, AppError> {
        let mut posts = self.list(false).await?;
        engagement::sort_by_popularity(&mut posts);
        posts.truncate(limit);
        Ok(posts)
    }

    /// A single published post.
    pub async fn post(&self, slug: &str) -> Result<EnrichedPost, AppError> {
        let post = self.published_post(slug).await?;
        self.enrich(vec![post])
            .await
            .pop()
            .ok_or(AppError::NotFound)
    }

    pub async fn record_view(&self, slug: &str) -> Result<u64, AppError> {
        let post = self.published_post(slug).await?;
        let views = self.views.record_view(&post.slug).await?;
        counter!("folio_views_recorded_total").increment(1);
        debug!(slug = %post.slug, views, "recorded post view");
        Ok(views)
    }

    /// Join `posts` with their counters. A failing counter store degrades to
    /// zero views rather than failing the request.
    pub async fn enrich(&self, posts: Vec<PostMetadata>) -> Vec<EnrichedPost> {
        let counters = self.load_counters(&posts).await;
        let now = (self.clock)();

        for post in posts.iter().filter(|post| post.published_on().is_none()) {
            debug!(
                slug = %post.slug,
                date = %post.date,
                "post date could not be parsed; treating as published today"
            );
        }

        engagement::enrich(posts, &counters, now)
    }

    async fn load_counters(&self, posts: &[PostMetadata]) -> HashMap<String, u64> {
        if posts.is_empty() {
            return HashMap::new();
        }

        let slugs: Vec<&str> = posts.iter().map(|post| post.slug.as_str()).collect();
        match self.views.views_for(&slugs).await {
            Ok(counters) => counters,
            Err(err) => {
                warn!(error = %err, "view counters unavailable; using zero views");
                HashMap::new()
            }
        }
    }

    async fn published_post(&self, slug: &str) -> Result<PostMetadata, AppError> {
        match self.posts.find_by_slug(slug).await? {
            Some(post) if !post.draft => Ok(post),
            _ => Err(AppError::NotFound),
        }
    }
}
