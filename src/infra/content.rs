//! Filesystem post store.
//!
//! Each post lives in `<content dir>/<slug>.mdx` (or `.md`) and opens with a
//! TOML frontmatter block:
//!
//! ```text
//! +++
//! title = "Shipping AI products"
//! date = 2024-05-01
//! keywords = ["ai", "product"]
//! +++
//! The MDX body follows.
//! ```

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

use crate::application::repos::{PostsRepo, PostsWriteRepo, RepoError, WritePostParams};
use crate::domain::posts::{Keywords, PostMetadata, reading_time_minutes, sort_newest_first};
use crate::domain::slug::is_valid_slug;
use crate::infra::atomic::{discard_staging, replace_file};

const FENCE: &str = "+++";
const EXTENSIONS: [&str; 2] = ["mdx", "md"];

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("missing `+++` frontmatter block")]
    MissingFrontmatter,
    #[error("unterminated frontmatter block")]
    UnterminatedFrontmatter,
    #[error("invalid frontmatter: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize frontmatter: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("frontmatter `date` must be a string or a TOML date")]
    InvalidDate,
}

#[derive(Debug, Deserialize, Serialize)]
struct Frontmatter {
    title: String,
    date: toml::Value,
    #[serde(default)]
    draft: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    description: String,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    author: Option<String>,
    #[serde(default, alias = "authorUrl", skip_serializing_if = "Option::is_none")]
    author_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image: Option<String>,
    #[serde(default, alias = "readingTime", skip_serializing_if = "Option::is_none")]
    reading_time: Option<u32>,
}

impl From<&WritePostParams> for Frontmatter {
    fn from(params: &WritePostParams) -> Self {
        Self {
            title: params.title.clone(),
            date: toml::Value::String(params.date.clone()),
            draft: params.draft,
            description: params.description.clone(),
            keywords: params.keywords.iter().map(str::to_string).collect(),
            author: params.author.clone(),
            author_url: params.author_url.clone(),
            image: params.image.clone(),
            reading_time: None,
        }
    }
}

/// A post file split into typed metadata and its raw body.
#[derive(Debug, Clone)]
pub struct ParsedPost {
    pub metadata: PostMetadata,
    pub body: String,
}

pub fn parse_post(slug: &str, source: &str) -> Result<ParsedPost, ContentError> {
    let (frontmatter, body) = split_frontmatter(source)?;
    let frontmatter: Frontmatter = toml::from_str(frontmatter)?;

    let date = match frontmatter.date {
        toml::Value::String(value) => value,
        toml::Value::Datetime(value) => datetime_to_post_date(&value)?,
        _ => return Err(ContentError::InvalidDate),
    };
    let reading_time = frontmatter
        .reading_time
        .filter(|minutes| *minutes > 0)
        .unwrap_or_else(|| reading_time_minutes(body));

    let metadata = PostMetadata {
        slug: slug.to_string(),
        title: frontmatter.title,
        date,
        draft: frontmatter.draft,
        description: frontmatter.description,
        keywords: Keywords::new(frontmatter.keywords),
        author: frontmatter.author,
        author_url: frontmatter.author_url,
        image: frontmatter.image,
        reading_time,
    };

    Ok(ParsedPost {
        metadata,
        body: body.to_string(),
    })
}

/// Offset datetimes keep their RFC 3339 form; local ones keep only the date.
fn datetime_to_post_date(value: &toml::value::Datetime) -> Result<String, ContentError> {
    match (value.date, value.offset) {
        (Some(_), Some(_)) => Ok(value.to_string()),
        (Some(date), None) => Ok(date.to_string()),
        (None, _) => Err(ContentError::InvalidDate),
    }
}

pub fn render_post(params: &WritePostParams) -> Result<String, ContentError> {
    let frontmatter = toml::to_string(&Frontmatter::from(params))?;
    let mut rendered = format!("{FENCE}\n{frontmatter}{FENCE}\n{}", params.body);
    if !rendered.ends_with('\n') {
        rendered.push('\n');
    }
    Ok(rendered)
}

fn split_frontmatter(source: &str) -> Result<(&str, &str), ContentError> {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let rest = source
        .strip_prefix(FENCE)
        .and_then(|rest| rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n')))
        .ok_or(ContentError::MissingFrontmatter)?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == FENCE {
            return Ok((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }

    Err(ContentError::UnterminatedFrontmatter)
}

#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn slug_for(path: &Path) -> Option<&str> {
        let extension = path.extension()?.to_str()?;
        if !EXTENSIONS.contains(&extension) {
            return None;
        }
        path.file_stem()?.to_str()
    }

    async fn locate(&self, slug: &str) -> Result<Option<PathBuf>, RepoError> {
        if !is_valid_slug(slug) {
            return Ok(None);
        }

        for extension in EXTENSIONS {
            let path = self.root.join(format!("{slug}.{extension}"));
            if fs::try_exists(&path)
                .await
                .map_err(RepoError::from_persistence)?
            {
                return Ok(Some(path));
            }
        }

        Ok(None)
    }

    async fn read_post(path: &Path, slug: &str) -> Result<PostMetadata, RepoError> {
        let source = fs::read_to_string(path)
            .await
            .map_err(RepoError::from_persistence)?;
        parse_post(slug, &source)
            .map(|parsed| parsed.metadata)
            .map_err(|err| RepoError::from_persistence(format!("{}: {err}", path.display())))
    }

    async fn write_post(
        &self,
        path: &Path,
        slug: &str,
        params: &WritePostParams,
    ) -> Result<PostMetadata, RepoError> {
        let rendered = render_post(params).map_err(RepoError::from_persistence)?;
        let metadata = parse_post(slug, &rendered)
            .map_err(RepoError::from_persistence)?
            .metadata;

        fs::create_dir_all(&self.root)
            .await
            .map_err(RepoError::from_persistence)?;
        let staging = self.root.join(format!(".{slug}.tmp"));
        if let Err(err) = replace_file(&staging, path, rendered.as_bytes()).await {
            discard_staging(&staging).await;
            return Err(RepoError::from_persistence(err));
        }

        debug!(path = %path.display(), "wrote post file");
        Ok(metadata)
    }
}

#[async_trait]
impl PostsRepo for ContentStore {
    async fn list_posts(&self, include_drafts: bool) -> Result<Vec<PostMetadata>, RepoError> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!(root = %self.root.display(), "content directory does not exist");
                return Ok(Vec::new());
            }
            Err(err) => return Err(RepoError::from_persistence(err)),
        };

        let mut posts = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(RepoError::from_persistence)?
        {
            let path = entry.path();
            let Some(slug) = Self::slug_for(&path) else {
                continue;
            };
            if !is_valid_slug(slug) {
                warn!(path = %path.display(), "skipping post with non URL-safe file name");
                continue;
            }

            match Self::read_post(&path, slug).await {
                Ok(post) if include_drafts || !post.draft => posts.push(post),
                Ok(_) => {}
                Err(err) => warn!(error = %err, "skipping unreadable post"),
            }
        }

        sort_newest_first(&mut posts);
        Ok(posts)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostMetadata>, RepoError> {
        match self.locate(slug).await? {
            Some(path) => Self::read_post(&path, slug).await.map(Some),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl PostsWriteRepo for ContentStore {
    async fn create_post(
        &self,
        slug: &str,
        params: &WritePostParams,
    ) -> Result<PostMetadata, RepoError> {
        if !is_valid_slug(slug) {
            return Err(RepoError::InvalidInput {
                message: format!("`{slug}` is not a valid slug"),
            });
        }
        if self.locate(slug).await?.is_some() {
            return Err(RepoError::Duplicate {
                slug: slug.to_string(),
            });
        }

        let path = self.root.join(format!("{slug}.{}", EXTENSIONS[0]));
        self.write_post(&path, slug, params).await
    }

    async fn update_post(
        &self,
        slug: &str,
        params: &WritePostParams,
    ) -> Result<PostMetadata, RepoError> {
        let path = self.locate(slug).await?.ok_or(RepoError::NotFound)?;
        self.write_post(&path, slug, params).await
    }

    async fn delete_post(&self, slug: &str) -> Result<(), RepoError> {
        let path = self.locate(slug).await?.ok_or(RepoError::NotFound)?;
        fs::remove_file(&path)
            .await
            .map_err(RepoError::from_persistence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "+++\n\
title = \"Shipping AI products\"\n\
date = 2024-05-01\n\
keywords = [\"ai\", \"product\", \"ai\"]\n\
readingTime = 7\n\
+++\n\
Hello there.\n";

    fn params(title: &str, draft: bool) -> WritePostParams {
        WritePostParams {
            title: title.to_string(),
            date: "2024-05-01".to_string(),
            draft,
            description: "About things".to_string(),
            keywords: Keywords::new(["ai", "product"]),
            author: Some("Ada".to_string()),
            author_url: None,
            image: None,
            body: "word ".repeat(450),
        }
    }

    #[test]
    fn parses_toml_frontmatter() {
        let parsed = parse_post("shipping", SAMPLE).expect("parse");
        let post = parsed.metadata;

        assert_eq!(post.slug, "shipping");
        assert_eq!(post.title, "Shipping AI products");
        assert_eq!(post.date, "2024-05-01");
        assert_eq!(post.keywords, Keywords::new(["ai", "product"]));
        assert_eq!(post.reading_time, 7);
        assert!(!post.draft);
        assert_eq!(parsed.body, "Hello there.\n");
    }

    fn dated(date: &str) -> String {
        format!("+++\ntitle = \"Dated\"\ndate = {date}\n+++\nBody.\n")
    }

    #[test]
    fn local_datetimes_keep_their_calendar_date() {
        let post = parse_post("dated", &dated("2020-01-01T10:00:00"))
            .expect("parse")
            .metadata;

        assert_eq!(post.date, "2020-01-01");
        assert_eq!(post.published_on(), Some(time::macros::date!(2020 - 01 - 01)));
    }

    #[test]
    fn offset_datetimes_resolve_to_utc_dates() {
        let post = parse_post("dated", &dated("2024-03-09T23:30:00-02:00"))
            .expect("parse")
            .metadata;

        assert_eq!(post.published_on(), Some(time::macros::date!(2024 - 03 - 10)));
    }

    #[test]
    fn time_only_dates_are_rejected() {
        assert!(matches!(
            parse_post("dated", &dated("10:00:00")),
            Err(ContentError::InvalidDate)
        ));
    }

    #[test]
    fn reading_time_falls_back_to_word_count() {
        let source = format!(
            "+++\ntitle = \"Long\"\ndate = \"2024-05-01\"\n+++\n{}",
            "word ".repeat(401)
        );
        let post = parse_post("long", &source).expect("parse").metadata;
        assert_eq!(post.reading_time, 3);
    }

    #[test]
    fn rejects_missing_or_unterminated_frontmatter() {
        assert!(matches!(
            parse_post("x", "title = \"x\"\n"),
            Err(ContentError::MissingFrontmatter)
        ));
        assert!(matches!(
            parse_post("x", "+++\ntitle = \"x\"\n"),
            Err(ContentError::UnterminatedFrontmatter)
        ));
        assert!(matches!(
            parse_post("x", "+++\ntitle = \"x\"\ndate = 3\n+++\n"),
            Err(ContentError::InvalidDate)
        ));
    }

    #[test]
    fn rendered_posts_parse_back() {
        let rendered = render_post(&params("Round trip", true)).expect("render");
        let post = parse_post("round-trip", &rendered).expect("parse").metadata;

        assert_eq!(post.title, "Round trip");
        assert!(post.draft);
        assert_eq!(post.author.as_deref(), Some("Ada"));
        assert_eq!(post.reading_time, 3);
    }

    #[tokio::test]
    async fn list_skips_drafts_and_broken_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ContentStore::new(dir.path());
        store
            .create_post("published", &params("Published", false))
            .await
            .expect("create published");
        store
            .create_post("draft", &params("Draft", true))
            .await
            .expect("create draft");
        fs::write(dir.path().join("broken.mdx"), "no frontmatter")
            .await
            .expect("write broken");
        fs::write(dir.path().join("notes.txt"), "ignored")
            .await
            .expect("write txt");

        let public = store.list_posts(false).await.expect("list");
        let all = store.list_posts(true).await.expect("list all");

        assert_eq!(public.len(), 1);
        assert_eq!(public[0].slug, "published");
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn missing_directory_lists_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ContentStore::new(dir.path().join("absent"));
        assert!(store.list_posts(true).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn create_update_delete_lifecycle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ContentStore::new(dir.path());

        store
            .create_post("hello", &params("Hello", false))
            .await
            .expect("create");
        let duplicate = store.create_post("hello", &params("Hello", false)).await;
        assert!(matches!(duplicate, Err(RepoError::Duplicate { .. })));

        let updated = store
            .update_post("hello", &params("Hello again", false))
            .await
            .expect("update");
        assert_eq!(updated.title, "Hello again");
        let found = store.find_by_slug("hello").await.expect("find");
        assert_eq!(found.map(|post| post.title).as_deref(), Some("Hello again"));

        store.delete_post("hello").await.expect("delete");
        assert!(store.find_by_slug("hello").await.expect("find").is_none());
        assert!(matches!(
            store.delete_post("hello").await,
            Err(RepoError::NotFound)
        ));
    }

    #[tokio::test]
    async fn failed_replace_leaves_no_staging_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ContentStore::new(dir.path());
        fs::create_dir(dir.path().join("blocked.mdx"))
            .await
            .expect("create blocking directory");
        fs::write(dir.path().join("blocked.mdx").join("keep"), "x")
            .await
            .expect("fill blocking directory");

        let result = store.update_post("blocked", &params("Blocked", false)).await;

        assert!(matches!(result, Err(RepoError::Persistence(_))));
        assert!(!dir.path().join(".blocked.tmp").exists());
    }

    #[tokio::test]
    async fn lookups_reject_path_traversal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ContentStore::new(dir.path());
        assert!(store.find_by_slug("../secret").await.expect("find").is_none());
    }
}
