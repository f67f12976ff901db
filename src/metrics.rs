// src/metrics.rs

use log::debug;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Share of total variance per component and its running sum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    explained_variance_ratio: Vec<f64>,
    cumulative_contribution: Vec<f64>,
}

impl Metrics {
    /// `eigenvalue[i] / sum(eigenvalues)`, one entry per component.
    pub fn explained_variance_ratio(&self) -> &[f64] {
        &self.explained_variance_ratio
    }

    /// Running sum of [`Metrics::explained_variance_ratio`]; ends at 1.
    pub fn cumulative_contribution(&self) -> &[f64] {
        &self.cumulative_contribution
    }

    pub fn n_components(&self) -> usize {
        self.explained_variance_ratio.len()
    }

    /// Smallest number of leading components whose cumulative contribution
    /// reaches `threshold`, if any.
    pub fn components_for_variance(&self, threshold: f64) -> Option<usize> {
        self.cumulative_contribution
            .iter()
            .position(|&c| c >= threshold)
            .map(|idx| idx + 1)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsCalculator;

impl MetricsCalculator {
    pub fn compute(&self, eigenvalues: &Array1<f64>) -> Result<Metrics, AnalysisError> {
        if eigenvalues.is_empty() {
            return Err(AnalysisError::Decomposition("no eigenvalues to summarize".to_string()));
        }
        let total: f64 = eigenvalues.sum();
        if !total.is_finite() || total <= 0.0 {
            return Err(AnalysisError::Decomposition(format!(
                "total variance must be positive and finite, got {}",
                total
            )));
        }

        let explained_variance_ratio: Vec<f64> = eigenvalues.iter().map(|v| v / total).collect();
        let cumulative_contribution: Vec<f64> = explained_variance_ratio
            .iter()
            .scan(0.0, |acc, &r| {
                *acc += r;
                Some(*acc)
            })
            .collect();
        debug!("Explained variance ratio: {:?}", explained_variance_ratio);
        debug!("Cumulative contribution: {:?}", cumulative_contribution);

        Ok(Metrics { explained_variance_ratio, cumulative_contribution })
    }
}
