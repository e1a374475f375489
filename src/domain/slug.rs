//! Slug derivation for posts created through the admin.
//!
//! A post's slug doubles as its file stem in the content directory and as its
//! key in the view counter store, so it must stay URL- and filesystem-safe.

use std::future::Future;

use slug::slugify;
use thiserror::Error;

const MAX_SUFFIX_ATTEMPTS: usize = 32;
const MAX_SLUG_LEN: usize = 96;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
    #[error("`{slug}` is not a valid slug")]
    Invalid { slug: String },
    #[error("exhausted attempts to find a unique slug for `{base}`")]
    Exhausted { base: String },
}

#[derive(Debug, Error)]
pub enum SlugAsyncError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error(transparent)]
    Predicate(E),
}

/// Derive a base slug from a post title.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let mut candidate = slugify(input);
    if candidate.len() > MAX_SLUG_LEN {
        candidate.truncate(MAX_SLUG_LEN);
        while candidate.ends_with('-') {
            candidate.pop();
        }
    }

    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

/// Lowercase ASCII alphanumerics separated by single hyphens.
pub fn is_valid_slug(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_SLUG_LEN
        && !value.starts_with('-')
        && !value.ends_with('-')
        && !value.contains("--")
        && value
            .bytes()
            .all(|byte| byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'-')
}

pub fn validate_slug(value: &str) -> Result<&str, SlugError> {
    if is_valid_slug(value) {
        Ok(value)
    } else {
        Err(SlugError::Invalid {
            slug: value.to_string(),
        })
    }
}

/// Derive a slug from `input`, suffixing `-2`, `-3`, … until `is_unique`
/// accepts one.
pub async fn generate_unique_slug_async<F, Fut, E>(
    input: &str,
    mut is_unique: F,
) -> Result<String, SlugAsyncError<E>>
where
    F: FnMut(&str) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    let base = derive_slug(input)?;

    if is_unique(&base).await.map_err(SlugAsyncError::Predicate)? {
        return Ok(base);
    }

    for attempt in 2..=MAX_SUFFIX_ATTEMPTS + 1 {
        let candidate = format!("{base}-{attempt}");
        if is_unique(&candidate)
            .await
            .map_err(SlugAsyncError::Predicate)?
        {
            return Ok(candidate);
        }
    }

    Err(SlugAsyncError::Slug(SlugError::Exhausted { base }))
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use super::*;

    #[test]
    fn derive_slug_lowercases_and_hyphenates() {
        assert_eq!(
            derive_slug("Shipping AI Products, Fast!").expect("slug"),
            "shipping-ai-products-fast"
        );
        assert_eq!(derive_slug("2024-01-01").expect("slug"), "2024-01-01");
    }

    #[test]
    fn derive_slug_rejects_blank_input() {
        assert_eq!(derive_slug("   "), Err(SlugError::EmptyInput));
    }

    #[test]
    fn slug_validation() {
        assert!(is_valid_slug("hello-world-2"));
        assert!(!is_valid_slug("Hello"));
        assert!(!is_valid_slug("../etc/passwd"));
        assert!(!is_valid_slug("-leading"));
        assert!(!is_valid_slug("double--hyphen"));
        assert!(!is_valid_slug(""));
    }

    #[tokio::test]
    async fn unique_slug_appends_counter() {
        let taken = ["pattern-library", "pattern-library-2"];
        let slug = generate_unique_slug_async("Pattern Library", |candidate| {
            let free = !taken.contains(&candidate);
            async move { Ok::<bool, Infallible>(free) }
        })
        .await
        .expect("unique slug");

        assert_eq!(slug, "pattern-library-3");
    }

    #[tokio::test]
    async fn unique_slug_gives_up_after_bounded_attempts() {
        let error = generate_unique_slug_async("Example", |_| async {
            Ok::<bool, Infallible>(false)
        })
        .await
        .expect_err("should exhaust attempts");

        assert!(matches!(
            error,
            SlugAsyncError::Slug(SlugError::Exhausted { ref base }) if base == "example"
        ));
    }
}
