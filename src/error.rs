// src/error.rs

use std::error::Error;
use std::fmt;

use thiserror::Error;

use crate::visualizer::PlotRole;

/// A thread-safe wrapper for standard dynamic errors,
/// so they implement `Send` and `Sync`.
pub type ThreadSafeStdError = Box<dyn Error + Send + Sync + 'static>;

/// Reasons the raw upload could not be turned into a [`crate::Table`].
///
/// Row numbers are 1-based and count data rows only (the header is not row 1).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("input is empty")]
    EmptyInput,
    #[error("header row is missing")]
    MissingHeader,
    #[error("header declares no feature columns after the category column")]
    NoFeatureColumns,
    #[error("feature column '{0}' appears more than once in the header")]
    DuplicateColumn(String),
    #[error("table has a header but no data rows")]
    NoDataRows,
    #[error("row {row} has {found} fields, but the header has {expected}")]
    InconsistentRowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("row {row}, column '{column}': value '{value}' is not a finite number")]
    NonNumericCell {
        row: usize,
        column: String,
        value: String,
    },
    #[error("malformed CSV: {0}")]
    Csv(String),
}

/// Stable, payload-free tag for each [`AnalysisError`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Parse,
    Validation,
    DegenerateColumn,
    Decomposition,
    Render,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Parse => "ParseError",
            ErrorKind::Validation => "ValidationError",
            ErrorKind::DegenerateColumn => "DegenerateColumnError",
            ErrorKind::Decomposition => "DecompositionError",
            ErrorKind::Render => "RenderError",
            ErrorKind::Config => "ConfigError",
        };
        f.write_str(name)
    }
}

/// Every way an analysis run can abort.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("failed to parse input table: {0}")]
    Parse(#[from] ParseError),
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("feature column '{column}' has zero variance; standardization is undefined")]
    DegenerateColumn { column: String },
    #[error("eigendecomposition failed: {0}")]
    Decomposition(String),
    #[error("failed to render {role} plot: {source}")]
    Render {
        role: PlotRole,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to read analysis configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl AnalysisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::Parse(_) => ErrorKind::Parse,
            AnalysisError::Validation(_) => ErrorKind::Validation,
            AnalysisError::DegenerateColumn { .. } => ErrorKind::DegenerateColumn,
            AnalysisError::Decomposition(_) => ErrorKind::Decomposition,
            AnalysisError::Render { .. } => ErrorKind::Render,
            AnalysisError::Config(_) => ErrorKind::Config,
        }
    }
}

impl From<ThreadSafeStdError> for AnalysisError {
    fn from(e: ThreadSafeStdError) -> Self {
        AnalysisError::Decomposition(e.to_string())
    }
}
