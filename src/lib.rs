pub mod boxplot;
pub mod config;
pub mod csv;
pub mod embed;
pub mod error;
pub mod labels;
pub mod matrix;
pub mod orchestrator;
pub mod session;
pub mod threshold;
pub mod vector;

pub use boxplot::BoxPlotStats;
pub use error::{ProviderError, VectorError};
pub use matrix::{DistanceEntry, DistanceMatrix, ModelId};
pub use orchestrator::{ComparisonOrchestrator, TextPair};
