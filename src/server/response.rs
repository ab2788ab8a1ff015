use crate::error::{ErrorCategory, SalesForecastError};
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};

/// JSON error body shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_columns: Option<Vec<String>>,
}

#[derive(Debug)]
pub enum ApiError {
    Pipeline(SalesForecastError),
    BadUpload(String),
    PayloadTooLarge(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Pipeline(err) => match err.category() {
                ErrorCategory::InvalidInput => StatusCode::BAD_REQUEST,
                ErrorCategory::ProcessingFailure => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::BadUpload(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            Self::Pipeline(err) => ErrorBody {
                error: serde_json::to_value(err.kind())
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_else(|| "pipeline_error".to_string()),
                detail: err.to_string(),
                missing_columns: err.missing_columns().map(<[String]>::to_vec),
            },
            Self::BadUpload(detail) => ErrorBody {
                error: "invalid_upload".to_string(),
                detail: detail.clone(),
                missing_columns: None,
            },
            Self::PayloadTooLarge(detail) => ErrorBody {
                error: "payload_too_large".to_string(),
                detail: detail.clone(),
                missing_columns: None,
            },
            Self::Internal(detail) => ErrorBody {
                error: "internal_error".to_string(),
                detail: detail.clone(),
                missing_columns: None,
            },
        }
    }
}

impl From<SalesForecastError> for ApiError {
    fn from(err: SalesForecastError) -> Self {
        Self::Pipeline(err)
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::BadUpload(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(err.body_text())
        } else {
            Self::BadUpload(err.body_text())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), "request failed: {:?}", self);
        } else {
            warn!(status = status.as_u16(), "request rejected: {:?}", self);
        }

        (status, Json(self.body())).into_response()
    }
}
