//! # Retail Pulse
//!
//! A library for turning retail transaction CSVs into gap-free daily revenue
//! series and short-horizon trend forecasts.
//!
//! ## Core Concepts
//!
//! - **Record Set**: The uploaded CSV as header-ordered string rows, each tagged with its line number
//! - **Validated Record Set**: A record set proven to carry the `date`, `sku`, `quantity` and `price` columns
//! - **Daily Series**: Revenue (`quantity × price`) summed per calendar day, with silent days filled as zero
//! - **Forecast**: Seven daily values projected by additive-trend exponential smoothing (Holt's linear method)
//! - **Report**: The last ten observed days followed by the forecast, tagged `history` / `forecast`
//!
//! ## Example
//!
//! ```rust
//! use retail_pulse::*;
//!
//! let csv = "date,sku,quantity,price\n\
//!            2024-01-01,SKU1,2,10.0\n\
//!            2024-01-01,SKU2,1,5.0\n\
//!            2024-01-03,SKU1,1,10.0\n";
//!
//! let report = process_sales_forecast(csv.as_bytes()).unwrap();
//! assert_eq!(report.history().count(), 3);
//! assert_eq!(report.forecast().count(), 7);
//! ```

pub mod aggregation;
pub mod engine;
pub mod error;
pub mod formatter;
pub mod ingestion;
pub mod schema;
pub mod utils;

#[cfg(feature = "server")]
pub mod server;

pub use aggregation::{aggregate_daily, DailySeries, MAX_SERIES_DAYS};
pub use engine::{FittedModel, Forecast, ForecastEngine, SmoothingParams, FORECAST_HORIZON};
pub use error::{ErrorCategory, ErrorKind, Result, SalesForecastError};
pub use formatter::{format_forecast, HISTORY_WINDOW};
pub use ingestion::{parse_csv_bytes, preview_rows, PREVIEW_ROWS};
pub use schema::*;

use log::{debug, info};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PointOrigin {
    /// Observed (aggregated) revenue for a past day
    History,
    /// Projected revenue for a day after the last observation
    Forecast,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ForecastPoint {
    #[schemars(description = "Calendar day, YYYY-MM-DD")]
    pub date: String,

    #[schemars(description = "Daily revenue (observed or projected)")]
    pub value: f64,

    pub origin: PointOrigin,
}

/// Runs uploads through the full pipeline.
///
/// Holds only the search resolution of the engine; every call is independent.
#[derive(Debug, Clone, Copy, Default)]
pub struct SalesForecastProcessor {
    engine: ForecastEngine,
}

impl SalesForecastProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_engine(engine: ForecastEngine) -> Self {
        Self { engine }
    }

    pub fn process(&self, bytes: &[u8]) -> Result<ForecastReport> {
        let records = parse_csv_bytes(bytes)?;
        self.process_record_set(records)
    }

    pub fn process_record_set(&self, records: RecordSet) -> Result<ForecastReport> {
        info!(
            "Processing {} rows with columns [{}]",
            records.len(),
            records.columns().join(", ")
        );

        let validated = validate_schema(records)?;
        let series = aggregate_daily(&validated)?;
        let model = self.engine.fit(&series)?;
        let forecast = model.forecast()?;
        let points = format_forecast(&series, &forecast);

        debug!(
            "Report holds {} points ({} to {})",
            points.len(),
            series.tail(HISTORY_WINDOW).start_date(),
            forecast.end_date()
        );

        Ok(ForecastReport {
            points,
            model: model.summary(),
        })
    }

    /// Row count and the first rows of a schema-valid upload.
    pub fn preview(&self, bytes: &[u8]) -> Result<UploadPreview> {
        let validated = validate_schema(parse_csv_bytes(bytes)?)?;
        let records = validated.record_set();

        info!("Previewing upload with {} rows", records.len());

        Ok(UploadPreview {
            rows_received: records.len(),
            preview: preview_rows(records),
        })
    }
}

pub fn process_sales_forecast(bytes: &[u8]) -> Result<ForecastReport> {
    SalesForecastProcessor::new().process(bytes)
}

pub fn forecast_record_set(records: RecordSet) -> Result<ForecastReport> {
    SalesForecastProcessor::new().process_record_set(records)
}

pub fn preview_upload(bytes: &[u8]) -> Result<UploadPreview> {
    SalesForecastProcessor::new().preview(bytes)
}
