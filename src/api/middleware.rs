//! API state and error handling
//!
//! Contains:
//! - `AppState`, the services shared by every handler
//! - `ApiError`, the JSON error body and its status mapping
//! - Conversions from service errors into `ApiError`

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::services::article::{ArticleService, ArticleServiceError};
use crate::services::site::SiteService;
use crate::services::slug::SlugError;
use crate::services::tag::{TagService, TagServiceError};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: crate::db::DynDatabasePool,
    pub article_service: Arc<ArticleService>,
    pub tag_service: Arc<TagService>,
    pub site_service: Arc<SiteService>,
    /// Page size used when a request does not name one
    pub page_size: u32,
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    /// HTTP status for this error's code
    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!("Request failed: {:#}", err);
        ApiError::internal_error("Internal server error")
    }
}

impl From<ArticleServiceError> for ApiError {
    fn from(err: ArticleServiceError) -> Self {
        match err {
            ArticleServiceError::NotFound(what) => {
                ApiError::not_found(format!("Article not found: {}", what))
            }
            ArticleServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            ArticleServiceError::InternalError(e) => e.into(),
        }
    }
}

impl From<TagServiceError> for ApiError {
    fn from(err: TagServiceError) -> Self {
        match err {
            TagServiceError::NotFound(slug) => ApiError::not_found(format!("Tag not found: {}", slug)),
            TagServiceError::InternalError(e) => e.into(),
        }
    }
}

impl From<SlugError> for ApiError {
    fn from(err: SlugError) -> Self {
        ApiError::validation_error(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::validation_error("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::new("SOMETHING_ELSE", "x").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_details_skipped_when_absent() {
        let json = serde_json::to_value(ApiError::not_found("gone")).unwrap();
        assert_eq!(json["error"]["code"], "NOT_FOUND");
        assert_eq!(json["error"]["message"], "gone");
        assert!(json["error"].get("details").is_none());

        let json = serde_json::to_value(ApiError::with_details(
            "VALIDATION_ERROR",
            "bad",
            serde_json::json!({"field": "text"}),
        ))
        .unwrap();
        assert_eq!(json["error"]["details"]["field"], "text");
    }

    #[test]
    fn test_service_error_conversion() {
        let err: ApiError = ArticleServiceError::NotFound("hello".into()).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err: ApiError = ArticleServiceError::ValidationError("bad".into()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err: ApiError = TagServiceError::InternalError(anyhow::anyhow!("db down")).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.error.message.contains("db down"));

        let err: ApiError = SlugError::EmptyInput.into();
        assert_eq!(err.error.code, "VALIDATION_ERROR");
    }
}
