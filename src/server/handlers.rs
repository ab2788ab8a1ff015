use super::response::ApiError;
use crate::error::Result;
use crate::schema::{ForecastReport, UploadPreview};
use crate::{preview_upload, process_sales_forecast};
use axum::body::Bytes;
use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::Json;
use serde_json::{json, Value};
use tracing::info;

/// Multipart field carrying the CSV upload.
pub const FILE_FIELD: &str = "file";

pub async fn root() -> Json<Value> {
    Json(json!({ "msg": "Backend is running" }))
}

pub async fn upload_csv(
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> std::result::Result<Json<UploadPreview>, ApiError> {
    let bytes = read_file_field(multipart?).await?;
    info!(bytes = bytes.len(), "previewing upload");

    let preview = run_pipeline(move || preview_upload(&bytes)).await?;
    Ok(Json(preview))
}

pub async fn forecast(
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> std::result::Result<Json<ForecastReport>, ApiError> {
    let bytes = read_file_field(multipart?).await?;
    info!(bytes = bytes.len(), "forecasting upload");

    let report = run_pipeline(move || process_sales_forecast(&bytes)).await?;
    Ok(Json(report))
}

async fn read_file_field(mut multipart: Multipart) -> std::result::Result<Bytes, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(FILE_FIELD) {
            return Ok(field.bytes().await?);
        }
    }

    Err(ApiError::BadUpload(format!(
        "multipart field '{}' is required",
        FILE_FIELD
    )))
}

/// Runs the CPU-bound pipeline on the blocking pool.
async fn run_pipeline<T, F>(job: F) -> std::result::Result<T, ApiError>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| ApiError::Internal(format!("pipeline task failed: {e}")))?
        .map_err(ApiError::from)
}
