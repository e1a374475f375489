//! Authoring workflow: create, edit and delete posts.
//!
//! Only wired into the HTTP router outside production.

use std::sync::Arc;

use serde::Deserialize;
use time::Date;
use tracing::info;

use crate::application::error::AppError;
use crate::application::repos::{PostsRepo, PostsWriteRepo, WritePostParams};
use crate::domain::error::DomainError;
use crate::domain::posts::{CALENDAR_DATE_FORMAT, Keywords, PostMetadata};
use crate::domain::slug::{SlugAsyncError, generate_unique_slug_async, validate_slug};

/// Post fields as submitted by the admin editor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostInput {
    #[serde(default)]
    pub slug: Option<String>,
    pub title: String,
    pub date: String,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub author_url: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub body: String,
}

impl PostInput {
    fn into_params(self) -> Result<WritePostParams, DomainError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(DomainError::validation("title", "must not be empty"));
        }

        let date = Date::parse(self.date.trim(), CALENDAR_DATE_FORMAT)
            .map_err(|_| DomainError::validation("date", "expected YYYY-MM-DD"))?;
        let date = date
            .format(CALENDAR_DATE_FORMAT)
            .map_err(|err| DomainError::validation("date", err.to_string()))?;

        Ok(WritePostParams {
            title: title.to_string(),
            date,
            draft: self.draft,
            description: self.description.trim().to_string(),
            keywords: Keywords::new(self.keywords),
            author: non_empty(self.author),
            author_url: non_empty(self.author_url),
            image: non_empty(self.image),
            body: self.body,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Clone)]
pub struct AdminPostService {
    reader: Arc<dyn PostsRepo>,
    writer: Arc<dyn PostsWriteRepo>,
}

impl AdminPostService {
    pub fn new(reader: Arc<dyn PostsRepo>, writer: Arc<dyn PostsWriteRepo>) -> Self {
        Self { reader, writer }
    }

    pub async fn create(&self, mut input: PostInput) -> Result<PostMetadata, AppError> {
        let requested_slug = input.slug.take();
        let params = input.into_params()?;

        let slug = match requested_slug {
            Some(slug) => validate_slug(slug.trim())?.to_string(),
            None => self.unique_slug_for(&params.title).await?,
        };

        let post = self.writer.create_post(&slug, &params).await?;
        info!(slug = %post.slug, draft = post.draft, "created post");
        Ok(post)
    }

    pub async fn update(&self, slug: &str, mut input: PostInput) -> Result<PostMetadata, AppError> {
        let slug = validate_slug(slug)?;
        let requested = input.slug.take();
        if requested.is_some_and(|requested| requested.trim() != slug) {
            return Err(AppError::validation(
                "changing a post's slug is not supported",
            ));
        }

        let params = input.into_params()?;
        let post = self.writer.update_post(slug, &params).await?;
        info!(slug = %post.slug, draft = post.draft, "updated post");
        Ok(post)
    }

    pub async fn delete(&self, slug: &str) -> Result<(), AppError> {
        let slug = validate_slug(slug)?;
        self.writer.delete_post(slug).await?;
        info!(slug, "deleted post");
        Ok(())
    }

    async fn unique_slug_for(&self, title: &str) -> Result<String, AppError> {
        let reader = self.reader.clone();
        generate_unique_slug_async(title, |candidate| {
            let reader = reader.clone();
            let candidate = candidate.to_string();
            async move {
                reader
                    .find_by_slug(&candidate)
                    .await
                    .map(|found| found.is_none())
            }
        })
        .await
        .map_err(|err| match err {
            SlugAsyncError::Slug(err) => AppError::Slug(err),
            SlugAsyncError::Predicate(err) => AppError::Repo(err),
        })
    }
}
