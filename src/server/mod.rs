//! HTTP transport for the forecasting pipeline (feature `server`).
//!
//! Routes:
//!
//! - `GET /` liveness message
//! - `POST /upload-csv/` multipart `file` -> [`UploadPreview`](crate::UploadPreview)
//! - `POST /forecast/` multipart `file` -> [`ForecastReport`](crate::ForecastReport)
//!
//! Upload routes also answer without the trailing slash.

pub mod config;
pub mod handlers;
pub mod response;

pub use config::{ConfigError, ServerConfig};
pub use response::{ApiError, ErrorBody};

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub fn build_router(config: &ServerConfig) -> Router {
    let routes = Router::new()
        .route("/", get(handlers::root))
        .route("/upload-csv/", post(handlers::upload_csv))
        .route("/upload-csv", post(handlers::upload_csv))
        .route("/forecast/", post(handlers::forecast))
        .route("/forecast", post(handlers::forecast));

    with_layers(routes, config)
}

/// Wraps `routes` in the upload limit, request timeout, CORS and tracing layers.
pub fn with_layers(routes: Router, config: &ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(config.allowed_origins.clone()))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request());

    routes
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Serves the router on an already bound listener until the process exits.
pub async fn serve(listener: TcpListener, config: &ServerConfig) -> std::io::Result<()> {
    axum::serve(listener, build_router(config)).await
}
