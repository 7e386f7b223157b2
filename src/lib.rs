pub mod config;
pub mod core;
pub mod error;

pub use crate::config::Config;
pub use crate::core::{AnalysisOptions, CancellationToken, TemporalGraph, WorkflowAnalyzer};
pub use crate::error::{AnalyzerError, Result};
