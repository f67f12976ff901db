// src/table.rs

use std::collections::HashSet;

use csv::{ReaderBuilder, StringRecord, Trim};
use log::{debug, info};
use ndarray::{Array2, ArrayView1};

use crate::error::ParseError;

/// A parsed upload: one categorical label column plus a numeric feature matrix.
///
/// Invariants: at least one row and one feature column, unique feature names,
/// every value finite, and `categories.len() == features.nrows()`.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    category_name: String,
    categories: Vec<String>,
    feature_names: Vec<String>,
    /// Shape: (n_rows, n_features)
    features: Array2<f64>,
}

impl Table {
    /// Name of the first header field.
    pub fn category_name(&self) -> &str {
        &self.category_name
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    pub fn n_rows(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    /// Values of the feature column called `name`, in row order.
    pub fn feature(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.feature_names
            .iter()
            .position(|n| n == name)
            .map(|j| self.features.column(j))
    }
}

/// Parses delimited text with a header row into a [`Table`].
#[derive(Debug, Clone, Copy)]
pub struct TableLoader {
    delimiter: u8,
}

impl Default for TableLoader {
    fn default() -> Self {
        Self::new(b',')
    }
}

impl TableLoader {
    pub fn new(delimiter: u8) -> Self {
        Self { delimiter }
    }

    /// Parses `bytes`. The first column holds category labels; every other
    /// column must be numeric and is named by the header.
    pub fn load(&self, bytes: &[u8]) -> Result<Table, ParseError> {
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(ParseError::EmptyInput);
        }

        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(bytes);

        let header = reader
            .headers()
            .map_err(|e| ParseError::Csv(e.to_string()))?
            .clone();
        let feature_names = Self::parse_header(&header)?;
        let width = header.len();
        debug!("Header declares {} feature columns: {:?}", feature_names.len(), feature_names);

        let mut categories = Vec::new();
        let mut values: Vec<f64> = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let row = idx + 1;
            let record = record.map_err(|e| ParseError::Csv(e.to_string()))?;
            if record.len() != width {
                return Err(ParseError::InconsistentRowWidth {
                    row,
                    expected: width,
                    found: record.len(),
                });
            }
            categories.push(record[0].to_string());
            for (name, cell) in feature_names.iter().zip(record.iter().skip(1)) {
                values.push(Self::parse_cell(row, name, cell)?);
            }
        }

        let n_rows = categories.len();
        if n_rows == 0 {
            return Err(ParseError::NoDataRows);
        }
        let features = Array2::from_shape_vec((n_rows, feature_names.len()), values)
            .map_err(|e| ParseError::Csv(format!("failed to shape feature matrix: {}", e)))?;

        info!(
            "Loaded table with {} rows, {} feature columns, category column '{}'.",
            n_rows,
            feature_names.len(),
            &header[0]
        );
        Ok(Table {
            category_name: header[0].to_string(),
            categories,
            feature_names,
            features,
        })
    }

    fn parse_header(header: &StringRecord) -> Result<Vec<String>, ParseError> {
        if header.is_empty() || header.iter().all(str::is_empty) {
            return Err(ParseError::MissingHeader);
        }
        if header.len() < 2 {
            return Err(ParseError::NoFeatureColumns);
        }
        let feature_names: Vec<String> = header.iter().skip(1).map(str::to_string).collect();
        // A header made only of numbers is a data row that lost its header.
        if feature_names.iter().all(|name| name.parse::<f64>().is_ok()) {
            return Err(ParseError::MissingHeader);
        }
        let mut seen = HashSet::with_capacity(feature_names.len());
        for name in &feature_names {
            if !seen.insert(name.as_str()) {
                return Err(ParseError::DuplicateColumn(name.clone()));
            }
        }
        Ok(feature_names)
    }

    fn parse_cell(row: usize, column: &str, cell: &str) -> Result<f64, ParseError> {
        match cell.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(ParseError::NonNumericCell {
                row,
                column: column.to_string(),
                value: cell.to_string(),
            }),
        }
    }
}
