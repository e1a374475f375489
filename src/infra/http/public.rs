use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::application::error::AppError;
use crate::domain::engagement::EnrichedPost;

use super::HttpState;

const DEFAULT_POPULAR_LIMIT: usize = 5;
const MAX_POPULAR_LIMIT: usize = 50;

pub(super) fn build_public_router(state: HttpState) -> Router {
    Router::new()
        .route("/api/posts", get(list_posts))
        .route("/api/posts/popular", get(popular_posts))
        .route("/api/posts/{slug}", get(post_detail))
        .route("/api/posts/{slug}/related", get(related_posts))
        .route("/api/posts/{slug}/views", post(record_view))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListQuery {
    drafts: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PopularQuery {
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ViewCount {
    slug: String,
    views: u64,
}

async fn list_posts(
    State(state): State<HttpState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<EnrichedPost>>, AppError> {
    state.engagement.list(query.drafts).await.map(Json)
}

async fn popular_posts(
    State(state): State<HttpState>,
    Query(query): Query<PopularQuery>,
) -> Result<Json<Vec<EnrichedPost>>, AppError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_POPULAR_LIMIT)
        .clamp(1, MAX_POPULAR_LIMIT);
    state.engagement.popular(limit).await.map(Json)
}

async fn post_detail(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
) -> Result<Json<EnrichedPost>, AppError> {
    state.engagement.post(&slug).await.map(Json)
}

async fn related_posts(State(state): State<HttpState>, Path(slug): Path<String>) -> Response {
    match state.recommendations.related_or_empty(&slug).await {
        Ok(posts) => Json(posts).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn record_view(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
) -> Result<Json<ViewCount>, AppError> {
    let views = state.engagement.record_view(&slug).await?;
    Ok(Json(ViewCount { slug, views }))
}
