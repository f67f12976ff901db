// src/config.rs

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::visualizer::PlotRole;

/// Upper bound on `width * height` of one plot (48 MB of RGB).
const MAX_PLOT_PIXELS: u64 = 16_000_000;

/// Pixel size of one rendered plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlotDimensions {
    pub width: u32,
    pub height: u32,
}

impl PlotDimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Configuration for one analysis run.
///
/// Every field has a default, so a collaborator may supply a partial JSON
/// document and only override what it cares about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Field delimiter of the uploaded table.
    pub delimiter: u8,
    /// A column whose sample standard deviation is at most
    /// `zero_variance_tolerance * max(1, |mean|)` is rejected as degenerate.
    pub zero_variance_tolerance: f64,
    /// Eigenvalues closer than this (relative to `max(1, |lambda|)`) are
    /// treated as tied and ordered by their dominant loading's feature index.
    pub eigenvalue_tie_tolerance: f64,
    pub contribution_plot: PlotDimensions,
    pub cumulative_plot: PlotDimensions,
    pub scatter_plot: PlotDimensions,
    pub loadings_plot: PlotDimensions,
}

impl Default for AnalysisConfig {
    /// Plot sizes match 8x5 and 8x6 inch figures at 100 dpi.
    fn default() -> Self {
        AnalysisConfig {
            delimiter: b',',
            zero_variance_tolerance: 1e-12,
            eigenvalue_tie_tolerance: 1e-10,
            contribution_plot: PlotDimensions::new(800, 500),
            cumulative_plot: PlotDimensions::new(800, 500),
            scatter_plot: PlotDimensions::new(800, 600),
            loadings_plot: PlotDimensions::new(800, 600),
        }
    }
}

impl AnalysisConfig {
    /// Parses a (possibly partial) JSON configuration and validates it.
    pub fn from_json_str(json: &str) -> Result<Self, AnalysisError> {
        let config: AnalysisConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !self.zero_variance_tolerance.is_finite() || self.zero_variance_tolerance <= 0.0 {
            return Err(AnalysisError::Validation(format!(
                "zero_variance_tolerance must be a positive finite number, got {}",
                self.zero_variance_tolerance
            )));
        }
        if !self.eigenvalue_tie_tolerance.is_finite() || self.eigenvalue_tie_tolerance < 0.0 {
            return Err(AnalysisError::Validation(format!(
                "eigenvalue_tie_tolerance must be a non-negative finite number, got {}",
                self.eigenvalue_tie_tolerance
            )));
        }
        if self.delimiter == b'"' || self.delimiter == b'\n' || self.delimiter == b'\r' {
            return Err(AnalysisError::Validation(format!(
                "delimiter {:?} cannot be used to separate fields",
                self.delimiter as char
            )));
        }
        let plots = [
            ("contribution_plot", PlotRole::Contribution, self.contribution_plot),
            ("cumulative_plot", PlotRole::Cumulative, self.cumulative_plot),
            ("scatter_plot", PlotRole::Scatter, self.scatter_plot),
            ("loadings_plot", PlotRole::Loadings, self.loadings_plot),
        ];
        for (name, role, dims) in plots {
            let min = role.min_dimensions();
            if dims.width < min.width || dims.height < min.height {
                return Err(AnalysisError::Validation(format!(
                    "{} must be at least {}x{} pixels, got {}x{}",
                    name, min.width, min.height, dims.width, dims.height
                )));
            }
            if dims.width as u64 * dims.height as u64 > MAX_PLOT_PIXELS {
                return Err(AnalysisError::Validation(format!(
                    "{} may cover at most {} pixels, got {}x{}",
                    name, MAX_PLOT_PIXELS, dims.width, dims.height
                )));
            }
        }
        Ok(())
    }
}
