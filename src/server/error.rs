use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::{error, warn};
use serde_json::json;

use crate::error::{ImageError, ImportError, StoreError};

/// Error returned by every handler, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Conflict(String),
    BadRequest(String),
    /// Public message plus the detail that only goes to the log.
    Internal { message: String, detail: String },
}

impl ApiError {
    pub fn internal(message: &str, detail: impl ToString) -> Self {
        ApiError::Internal {
            message: message.to_string(),
            detail: detail.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::NotFound(m) | ApiError::Conflict(m) | ApiError::BadRequest(m) => {
                warn!("{}: {}", status, m);
                m
            }
            ApiError::Internal { message, detail } => {
                error!("{}: {}", message, detail);
                message
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(slug) => ApiError::NotFound(format!("recipe '{slug}' not found")),
            StoreError::Conflict(slug) => ApiError::Conflict(format!("recipe '{slug}' already exists")),
            other => ApiError::internal("failed to read recipes", other),
        }
    }
}

impl From<ImageError> for ApiError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::InvalidSize(size) => ApiError::BadRequest(format!("invalid size '{size}'")),
            ImageError::UnsupportedFormat(_) => ApiError::BadRequest("unsupported image format".to_string()),
            ImageError::NotFound(name) => ApiError::NotFound(format!("image '{name}' not found")),
            other @ ImageError::Processing { .. } => ApiError::internal("failed to process image", other),
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Conflict(slug) => ApiError::Conflict(format!("recipe '{slug}' already exists")),
            ImportError::FetchError(_) => ApiError::internal("failed to fetch the recipe page", err),
            ImportError::ExtractionError(_) => ApiError::internal("failed to extract a recipe", err),
            ImportError::SchemaValidationError(_) => {
                ApiError::internal("extracted recipe does not match the schema", err)
            }
            ImportError::ImageDownloadError(_) => ApiError::internal("failed to download the recipe image", err),
            ImportError::PersistError(_) => ApiError::internal("failed to save the recipe", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(StoreError::NotFound("x".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(ImportError::Conflict("x".into())).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(ImageError::InvalidSize("huge".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(ImageError::UnsupportedFormat("a.bmp".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(ImportError::FetchError("timeout".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_message_hides_detail() {
        let err = ApiError::from(ImportError::FetchError("https://secret.example returned 403".into()));
        match err {
            ApiError::Internal { message, detail } => {
                assert_eq!(message, "failed to fetch the recipe page");
                assert!(detail.contains("403"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
