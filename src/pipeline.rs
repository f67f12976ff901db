// src/pipeline.rs

use std::time::Instant;

use log::{debug, info, warn};

use crate::categories::{CategoryCodes, CategoryEncoder};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::metrics::{Metrics, MetricsCalculator};
use crate::pca::{PcaEngine, PcaResult};
use crate::standardize::Standardizer;
use crate::table::TableLoader;
use crate::visualizer::{PlotArtifact, PlotRole, Visualizer};

/// Everything one analysis run produces. Built once, read-only afterwards.
#[derive(Debug, Clone)]
pub struct ResultBundle {
    metrics: Metrics,
    pca: PcaResult,
    categories: CategoryCodes,
    contribution_plot: PlotArtifact,
    cumulative_plot: PlotArtifact,
    scatter_plot: PlotArtifact,
    loadings_plot: PlotArtifact,
}

impl ResultBundle {
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn explained_variance_ratio(&self) -> &[f64] {
        self.metrics.explained_variance_ratio()
    }

    pub fn cumulative_contribution(&self) -> &[f64] {
        self.metrics.cumulative_contribution()
    }

    /// Components, eigenvalues and scores behind the plots.
    pub fn pca(&self) -> &PcaResult {
        &self.pca
    }

    pub fn categories(&self) -> &CategoryCodes {
        &self.categories
    }

    pub fn contribution_plot(&self) -> &PlotArtifact {
        &self.contribution_plot
    }

    pub fn cumulative_plot(&self) -> &PlotArtifact {
        &self.cumulative_plot
    }

    pub fn scatter_plot(&self) -> &PlotArtifact {
        &self.scatter_plot
    }

    pub fn loadings_plot(&self) -> &PlotArtifact {
        &self.loadings_plot
    }

    pub fn plot(&self, role: PlotRole) -> &PlotArtifact {
        match role {
            PlotRole::Contribution => &self.contribution_plot,
            PlotRole::Cumulative => &self.cumulative_plot,
            PlotRole::Scatter => &self.scatter_plot,
            PlotRole::Loadings => &self.loadings_plot,
        }
    }

    /// The four plots in [`PlotRole::ALL`] order.
    pub fn plots(&self) -> [&PlotArtifact; 4] {
        PlotRole::ALL.map(|role| self.plot(role))
    }
}

/// Runs load → standardize → PCA → metrics → encode → render on one upload.
///
/// Holds only configuration, so one pipeline can serve concurrent runs from
/// several threads.
#[derive(Debug, Clone)]
pub struct AnalysisPipeline {
    loader: TableLoader,
    standardizer: Standardizer,
    engine: PcaEngine,
    metrics: MetricsCalculator,
    encoder: CategoryEncoder,
    visualizer: Visualizer,
}

impl Default for AnalysisPipeline {
    fn default() -> Self {
        Self::from_checked_config(&AnalysisConfig::default())
    }
}

impl AnalysisPipeline {
    /// # Errors
    /// `Validation` if `config` fails [`AnalysisConfig::validate`].
    pub fn new(config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self::from_checked_config(config))
    }

    fn from_checked_config(config: &AnalysisConfig) -> Self {
        Self {
            loader: TableLoader::new(config.delimiter),
            standardizer: Standardizer::new(config.zero_variance_tolerance),
            engine: PcaEngine::new(config.eigenvalue_tie_tolerance),
            metrics: MetricsCalculator,
            encoder: CategoryEncoder,
            visualizer: Visualizer::new(config),
        }
    }

    /// Entry point for request handlers, where the file field may be absent.
    pub fn run_upload(&self, upload: Option<&[u8]>) -> Result<ResultBundle, AnalysisError> {
        match upload {
            Some(bytes) => self.run(bytes),
            None => {
                warn!("Analysis requested without an uploaded file.");
                Err(AnalysisError::Validation("no file was uploaded".to_string()))
            }
        }
    }

    /// Analyzes one CSV upload. The first error from any stage is returned
    /// unchanged and no bundle is produced.
    pub fn run(&self, bytes: &[u8]) -> Result<ResultBundle, AnalysisError> {
        let overall_start_time = Instant::now();
        info!("Starting analysis of a {}-byte upload.", bytes.len());

        let stage_start_time = Instant::now();
        let table = self.loader.load(bytes)?;
        info!(
            "Loaded table with {} rows and {} features in {:?}",
            table.n_rows(),
            table.n_features(),
            stage_start_time.elapsed()
        );

        let stage_start_time = Instant::now();
        let standardized = self.standardizer.standardize(&table)?;
        info!("Standardized feature matrix in {:?}", stage_start_time.elapsed());

        let stage_start_time = Instant::now();
        let pca = self.engine.fit(&standardized)?;
        info!("Computed {} principal components in {:?}", pca.n_components(), stage_start_time.elapsed());

        let metrics = self.metrics.compute(pca.eigenvalues())?;
        let categories = self.encoder.encode(table.categories());
        debug!(
            "Column '{}' holds {} distinct categories.",
            table.category_name(),
            categories.n_categories()
        );

        let stage_start_time = Instant::now();
        let contribution_plot = self.visualizer.contribution_chart(metrics.explained_variance_ratio())?;
        let cumulative_plot = self.visualizer.cumulative_chart(metrics.cumulative_contribution())?;
        let scatter_plot = self.visualizer.score_scatter(pca.scores(), &categories)?;
        let loadings_plot = self.visualizer.loading_scatter(pca.rotation(), pca.feature_names())?;
        info!("Rendered 4 plots in {:?}", stage_start_time.elapsed());

        info!(
            "Analysis finished in {:?}. PC1 explains {:.4} of the variance.",
            overall_start_time.elapsed(),
            metrics.explained_variance_ratio()[0]
        );
        Ok(ResultBundle {
            metrics,
            pca,
            categories,
            contribution_plot,
            cumulative_plot,
            scatter_plot,
            loadings_plot,
        })
    }
}
