use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{post, put},
};

use crate::application::{admin::PostInput, error::AppError};
use crate::domain::posts::PostMetadata;

use super::AdminState;

pub(super) fn build_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/posts", post(create_post))
        .route("/admin/posts/{slug}", put(update_post).delete(delete_post))
        .with_state(state)
}

async fn create_post(
    State(state): State<AdminState>,
    Json(input): Json<PostInput>,
) -> Result<(StatusCode, Json<PostMetadata>), AppError> {
    let post = state.posts.create(input).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn update_post(
    State(state): State<AdminState>,
    Path(slug): Path<String>,
    Json(input): Json<PostInput>,
) -> Result<Json<PostMetadata>, AppError> {
    state.posts.update(&slug, input).await.map(Json)
}

async fn delete_post(
    State(state): State<AdminState>,
    Path(slug): Path<String>,
) -> Result<StatusCode, AppError> {
    state.posts.delete(&slug).await?;
    Ok(StatusCode::NO_CONTENT)
}
