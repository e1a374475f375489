use std::error::Error as StdError;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

use crate::{
    application::repos::RepoError,
    domain::{error::DomainError, slug::SlugError},
    infra::error::InfraError,
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error("resource not found")]
    NotFound,
    #[error("validation failed: {0}")]
    Validation(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Repo(RepoError::NotFound)
            | AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Domain(DomainError::Validation { .. })
            | AppError::Repo(RepoError::InvalidInput { .. })
            | AppError::Slug(_)
            | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Repo(RepoError::Duplicate { .. }) => StatusCode::CONFLICT,
            AppError::Repo(RepoError::Persistence(_)) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Infra(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn presentation_message(&self) -> String {
        match self.status_code() {
            StatusCode::NOT_FOUND => "Resource not found".to_string(),
            StatusCode::BAD_REQUEST | StatusCode::CONFLICT => self.to_string(),
            StatusCode::SERVICE_UNAVAILABLE => "Service temporarily unavailable".to_string(),
            _ => "Unexpected error occurred".to_string(),
        }
    }
}

/// Flatten an error and its sources into one line for logging.
pub fn error_chain(error: &dyn StdError) -> String {
    let mut messages = vec![error.to_string()];
    let mut current = error.source();
    while let Some(inner) = current {
        messages.push(inner.to_string());
        current = inner.source();
    }
    messages.join(": ")
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(
                source = "application::error::AppError",
                status = status.as_u16(),
                error = %error_chain(&self),
                "request failed"
            );
        } else {
            debug!(
                source = "application::error::AppError",
                status = status.as_u16(),
                error = %self,
                "request rejected"
            );
        }

        let body = Json(json!({ "error": self.presentation_message() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_errors_to_status_codes() {
        assert_eq!(AppError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::from(RepoError::Duplicate {
                slug: "hello".to_string()
            })
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(DomainError::validation("title", "must not be empty")).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(RepoError::from_persistence("disk full")).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn error_chain_includes_sources() {
        let io = std::io::Error::other("disk gone");
        let error = AppError::from(InfraError::from(io));
        assert!(error_chain(&error).contains("disk gone"));
    }
}
