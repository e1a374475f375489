//! Repository traits describing persistence adapters.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::posts::{Keywords, PostMetadata};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("post `{slug}` already exists")]
    Duplicate { slug: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Authored content for a post, as written by the admin.
#[derive(Debug, Clone, PartialEq)]
pub struct WritePostParams {
    pub title: String,
    pub date: String,
    pub draft: bool,
    pub description: String,
    pub keywords: Keywords,
    pub author: Option<String>,
    pub author_url: Option<String>,
    pub image: Option<String>,
    pub body: String,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// All posts, newest first. Drafts are only included when asked for.
    async fn list_posts(&self, include_drafts: bool) -> Result<Vec<PostMetadata>, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostMetadata>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(
        &self,
        slug: &str,
        params: &WritePostParams,
    ) -> Result<PostMetadata, RepoError>;

    async fn update_post(
        &self,
        slug: &str,
        params: &WritePostParams,
    ) -> Result<PostMetadata, RepoError>;

    async fn delete_post(&self, slug: &str) -> Result<(), RepoError>;
}

/// Key→counter store for page views. A missing key means zero views.
#[async_trait]
pub trait ViewCountsRepo: Send + Sync {
    async fn views_for(&self, slugs: &[&str]) -> Result<HashMap<String, u64>, RepoError>;

    /// Increment the counter for `slug` and return the new value.
    async fn record_view(&self, slug: &str) -> Result<u64, RepoError>;
}
