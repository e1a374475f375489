//! End-to-end ranking scenarios: aggregation feeding the ranker.

use std::collections::HashMap;
use std::sync::Arc;

use time::{OffsetDateTime, macros::datetime};

use folio::application::engagement::EngagementService;
use folio::application::recommendations::RecommendationService;
use folio::application::repos::{PostsRepo, PostsWriteRepo, ViewCountsRepo, WritePostParams};
use folio::domain::engagement::enrich;
use folio::domain::posts::{Keywords, PostMetadata};
use folio::domain::recommendations::{
    RecommendationOptions, RecommendationRequest, rank, recommend,
};
use folio::infra::content::ContentStore;
use folio::infra::views::ViewCounterStore;

const NOW: OffsetDateTime = datetime!(2024-06-11 12:00 UTC);

fn fixed_now() -> OffsetDateTime {
    NOW
}

fn post(slug: &str, title: &str, date: &str, keywords: &[&str]) -> PostMetadata {
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
        reading_time: 4,
    }
}

fn slugs<'a>(posts: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    posts.into_iter().collect()
}

#[test]
fn blended_score_prefers_topical_and_popular_posts() {
    let posts = vec![
        post("a", "A", "2024-06-01", &["ai", "product"]),
        post("b", "B", "2024-06-01", &["ai"]),
        post("c", "C", "2024-03-03", &["cooking"]),
    ];
    let counters = HashMap::from([
        ("a".to_string(), 100),
        ("b".to_string(), 10),
        ("c".to_string(), 1000),
    ]);

    let enriched = enrich(posts, &counters, NOW);
    let per_day: Vec<f64> = enriched.iter().map(|post| post.views_per_day).collect();
    assert_eq!(per_day, [10.0, 1.0, 10.0]);

    let options = RecommendationOptions::new(0.3, 3, 1).expect("options");
    let ranked = rank(RecommendationRequest {
        current_slug: "current".to_string(),
        current_keywords: Keywords::new(["ai", "product"]),
        candidates: enriched.clone(),
        options,
    });

    let order = slugs(ranked.iter().map(|scored| scored.post.slug()));
    assert_eq!(order, ["a", "b", "c"]);
    assert!((ranked[0].score - 1.0).abs() < 1e-9);
    assert!((ranked[1].score - 0.38).abs() < 1e-9);
    assert!((ranked[2].score - 0.3).abs() < 1e-9);
    assert_eq!(ranked[1].keyword_score, 0.5);
    assert!((ranked[1].view_score - 0.1).abs() < 1e-9);

    let options = RecommendationOptions::new(0.3, 2, 1).expect("options");
    let result = recommend(RecommendationRequest {
        current_slug: "current".to_string(),
        current_keywords: Keywords::new(["ai", "product"]),
        candidates: enriched,
        options,
    });
    assert_eq!(slugs(result.iter().map(|post| post.slug())), ["a", "b"]);
}

#[test]
fn newsletter_quota_skips_the_lower_issue() {
    let posts = vec![
        post("issue-jan", "2024-01-01", "2024-01-01", &["ai", "product"]),
        post("issue-jun", "2024-06-01", "2024-06-01", &["ai", "product"]),
        post("essay", "On shipping", "2024-05-01", &["ai"]),
        post("recipe", "Bread", "2024-05-01", &["cooking"]),
        post("misc", "Misc", "2024-05-01", &[]),
    ];
    let counters = HashMap::from([
        ("issue-jan".to_string(), 5000),
        ("issue-jun".to_string(), 500),
        ("recipe".to_string(), 41),
    ]);
    let enriched = enrich(posts, &counters, NOW);

    let options = RecommendationOptions::new(0.3, 3, 1).expect("options");
    let result = recommend(RecommendationRequest {
        current_slug: "current".to_string(),
        current_keywords: Keywords::new(["ai", "product"]),
        candidates: enriched,
        options,
    });

    let order = slugs(result.iter().map(|post| post.slug()));
    assert_eq!(order.len(), 3);
    assert_eq!(
        result.iter().filter(|post| post.post.is_newsletter()).count(),
        1
    );
    assert_eq!(order, ["issue-jun", "essay", "recipe"]);
}

fn params(title: &str, date: &str, keywords: &[&str], draft: bool) -> WritePostParams {
    WritePostParams {
        title: title.to_string(),
        date: date.to_string(),
        draft,
        description: String::new(),
        keywords: Keywords::new(keywords),
        author: None,
        author_url: None,
        image: None,
        body: "Some words here.".to_string(),
    }
}

#[tokio::test]
async fn service_ranks_posts_from_the_content_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(ContentStore::new(dir.path()));
    store
        .create_post("current", &params("Current", "2024-06-01", &["ai", "product"], false))
        .await
        .expect("create current");
    store
        .create_post("a", &params("A", "2024-06-01", &["ai", "product"], false))
        .await
        .expect("create a");
    store
        .create_post("b", &params("B", "2024-06-01", &["ai"], false))
        .await
        .expect("create b");
    store
        .create_post("hidden", &params("Hidden", "2024-06-01", &["ai", "product"], true))
        .await
        .expect("create draft");

    let views = Arc::new(ViewCounterStore::in_memory());
    for _ in 0..3 {
        views.record_view("b").await.expect("record");
    }

    let posts: Arc<dyn PostsRepo> = store;
    let counters: Arc<dyn ViewCountsRepo> = views;
    let engagement = EngagementService::new(posts, counters).with_clock(fixed_now);
    let service = RecommendationService::new(engagement, RecommendationOptions::default());

    let related = service.related("current").await.expect("related");
    let order = slugs(related.iter().map(|post| post.slug()));
    assert_eq!(order, ["a", "b"]);
    assert_eq!(related[1].views, 3);
    assert_eq!(related[1].views_per_day, 0.3);
}

#[tokio::test]
async fn unknown_posts_have_no_recommendations() {
    let dir = tempfile::tempdir().expect("tempdir");
    let posts: Arc<dyn PostsRepo> = Arc::new(ContentStore::new(dir.path()));
    let counters: Arc<dyn ViewCountsRepo> = Arc::new(ViewCounterStore::in_memory());
    let engagement = EngagementService::new(posts, counters);
    let service = RecommendationService::new(engagement, RecommendationOptions::default());

    assert!(service.related("missing").await.is_err());
}

#[tokio::test]
async fn drafts_are_only_related_with_previews_enabled() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(ContentStore::new(dir.path()));
    store
        .create_post("draft", &params("Draft", "2024-06-01", &["ai"], true))
        .await
        .expect("create draft");
    store
        .create_post("live", &params("Live", "2024-06-01", &["ai"], false))
        .await
        .expect("create live");

    let posts: Arc<dyn PostsRepo> = store;
    let counters: Arc<dyn ViewCountsRepo> = Arc::new(ViewCounterStore::in_memory());
    let engagement = EngagementService::new(posts, counters).with_clock(fixed_now);
    let public = RecommendationService::new(engagement.clone(), RecommendationOptions::default());
    let preview = RecommendationService::new(engagement, RecommendationOptions::default())
        .with_draft_previews(true);

    assert!(public.related("draft").await.is_err());
    let related = preview.related("draft").await.expect("preview related");
    assert_eq!(slugs(related.iter().map(|post| post.slug())), ["live"]);
}
