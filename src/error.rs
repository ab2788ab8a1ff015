use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SalesForecastError {
    #[error("Malformed CSV input: {0}")]
    MalformedCsv(String),

    #[error("Invalid value in column '{column}' on line {line}: {details}")]
    InvalidField {
        line: u64,
        column: String,
        details: String,
    },

    #[error("Invalid daily series: {0}")]
    InvalidSeries(String),

    #[error("CSV is missing required columns: {} (required: date, sku, quantity, price)", .missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    #[error("No transaction rows to aggregate")]
    EmptySeries,

    #[error("Model fitting failed: {0}")]
    ModelFit(String),
}

/// Discriminant of the error taxonomy exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ParseError,
    SchemaError,
    EmptySeriesError,
    ModelFitError,
}

/// Whether the caller sent bad input or the pipeline itself failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    InvalidInput,
    ProcessingFailure,
}

impl SalesForecastError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedCsv(_) | Self::InvalidField { .. } | Self::InvalidSeries(_) => {
                ErrorKind::ParseError
            }
            Self::MissingColumns { .. } => ErrorKind::SchemaError,
            Self::EmptySeries => ErrorKind::EmptySeriesError,
            Self::ModelFit(_) => ErrorKind::ModelFitError,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self.kind() {
            ErrorKind::ParseError | ErrorKind::SchemaError | ErrorKind::EmptySeriesError => {
                ErrorCategory::InvalidInput
            }
            ErrorKind::ModelFitError => ErrorCategory::ProcessingFailure,
        }
    }

    /// Names of the required columns absent from the upload, if that is what failed.
    pub fn missing_columns(&self) -> Option<&[String]> {
        match self {
            Self::MissingColumns { missing } => Some(missing),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SalesForecastError>;
