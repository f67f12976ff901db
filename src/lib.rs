// Standardized PCA reports over labelled CSV tables

#![doc = include_str!("../README.md")]

pub mod canvas;
pub mod categories;
pub mod config;
pub mod error;
pub mod linalg_backends;
pub mod metrics;
pub mod pca;
pub mod pipeline;
pub mod standardize;
pub mod table;
pub mod visualizer;

pub use categories::{CategoryCodes, CategoryEncoder};
pub use config::{AnalysisConfig, PlotDimensions};
pub use error::{AnalysisError, ErrorKind, ParseError, ThreadSafeStdError};
pub use linalg_backends::{BackendEigh, EighOutput, LinAlgBackendProvider, NalgebraLinAlgBackend};
pub use metrics::{Metrics, MetricsCalculator};
pub use pca::{PcaEngine, PcaResult};
pub use pipeline::{AnalysisPipeline, ResultBundle};
pub use standardize::{StandardizedMatrix, Standardizer};
pub use table::{Table, TableLoader};
pub use visualizer::{PlotArtifact, PlotRole, Visualizer};

#[cfg(feature = "lapack")]
pub use linalg_backends::NdarrayLinAlgBackend;
