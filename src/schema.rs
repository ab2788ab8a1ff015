use crate::error::{Result, SalesForecastError};
use crate::ingestion::parse_record;
use crate::ForecastPoint;
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Columns every upload must carry, in canonical order.
pub const REQUIRED_COLUMNS: [&str; 4] = ["date", "sku", "quantity", "price"];

/// One typed transaction row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RawRecord {
    pub date: NaiveDate,
    pub sku: String,
    pub quantity: u64,
    pub price: f64,
}

impl RawRecord {
    pub fn revenue(&self) -> f64 {
        self.quantity as f64 * self.price
    }
}

/// A CSV data row as read, before any typing. `line` is the 1-based line in the upload.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularRow {
    pub line: u64,
    pub fields: Vec<String>,
}

impl TabularRow {
    /// Field at `idx`, or `None` when the row was shorter than the header.
    pub fn get(&self, idx: usize) -> Option<&str> {
        self.fields.get(idx).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordSet {
    columns: Vec<String>,
    rows: Vec<TabularRow>,
}

impl RecordSet {
    pub fn new(columns: Vec<String>, rows: Vec<TabularRow>) -> Self {
        Self { columns, rows }
    }

    /// Builds a record set with the canonical columns from already-typed records.
    pub fn from_records(records: &[RawRecord]) -> Self {
        let columns = REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect();
        let rows = records
            .iter()
            .enumerate()
            .map(|(idx, r)| TabularRow {
                line: idx as u64 + 2,
                fields: vec![
                    r.date.format("%Y-%m-%d").to_string(),
                    r.sku.clone(),
                    r.quantity.to_string(),
                    r.price.to_string(),
                ],
            })
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[TabularRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column_count(&self, name: &str) -> usize {
        self.columns.iter().filter(|c| *c == name).count()
    }
}

/// Positions of the required columns inside a validated record set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub date: usize,
    pub sku: usize,
    pub quantity: usize,
    pub price: usize,
}

/// A record set known to carry every required column.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRecordSet {
    records: RecordSet,
    layout: ColumnLayout,
}

impl ValidatedRecordSet {
    pub fn record_set(&self) -> &RecordSet {
        &self.records
    }

    pub fn layout(&self) -> ColumnLayout {
        self.layout
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Types each row lazily; the first bad field ends iteration with its error.
    pub fn records(&self) -> impl Iterator<Item = Result<RawRecord>> + '_ {
        self.records
            .rows()
            .iter()
            .map(move |row| parse_record(row, &self.layout))
    }

    pub fn into_inner(self) -> RecordSet {
        self.records
    }
}

pub fn validate_schema(records: RecordSet) -> Result<ValidatedRecordSet> {
    let layout = match (
        records.column_index("date"),
        records.column_index("sku"),
        records.column_index("quantity"),
        records.column_index("price"),
    ) {
        (Some(date), Some(sku), Some(quantity), Some(price)) => ColumnLayout {
            date,
            sku,
            quantity,
            price,
        },
        _ => {
            let missing = REQUIRED_COLUMNS
                .iter()
                .filter(|name| records.column_index(name).is_none())
                .map(|name| name.to_string())
                .collect();
            return Err(SalesForecastError::MissingColumns { missing });
        }
    };

    // A repeated required header would make the row values ambiguous.
    if let Some(name) = REQUIRED_COLUMNS
        .iter()
        .find(|name| records.column_count(name) > 1)
    {
        return Err(SalesForecastError::MalformedCsv(format!(
            "column '{}' appears more than once in the header",
            name
        )));
    }

    Ok(ValidatedRecordSet { records, layout })
}

/// Fitted smoothing state reported next to the forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ModelSummary {
    #[schemars(description = "Level smoothing coefficient in [0, 1]")]
    pub alpha: f64,

    #[schemars(description = "Trend smoothing coefficient in [0, 1]")]
    pub beta: f64,

    #[schemars(description = "Smoothed level after the last observed day")]
    pub level: f64,

    #[schemars(description = "Smoothed daily trend after the last observed day")]
    pub trend: f64,

    #[schemars(description = "In-sample sum of squared one-step-ahead errors")]
    pub sse: f64,

    #[schemars(description = "In-sample root mean squared one-step-ahead error")]
    pub rmse: f64,

    #[schemars(description = "Number of days in the fitted daily series")]
    pub observations: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ForecastReport {
    #[schemars(
        description = "Up to 10 most recent historical days followed by 7 forecast days, in chronological order"
    )]
    pub points: Vec<ForecastPoint>,

    pub model: ModelSummary,
}

impl ForecastReport {
    pub fn history(&self) -> impl Iterator<Item = &ForecastPoint> {
        self.points.iter().filter(|p| p.origin == crate::PointOrigin::History)
    }

    pub fn forecast(&self) -> impl Iterator<Item = &ForecastPoint> {
        self.points.iter().filter(|p| p.origin == crate::PointOrigin::Forecast)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ForecastReport)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::generate_json_schema())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UploadPreview {
    #[schemars(description = "Number of data rows in the upload (header excluded)")]
    pub rows_received: usize,

    #[schemars(description = "First rows of the upload as column -> value maps, in header order")]
    pub preview: Vec<serde_json::Map<String, serde_json::Value>>,
}

impl UploadPreview {
    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(UploadPreview)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::generate_json_schema())
    }
}
