// src/core/analyzer.rs
use std::path::PathBuf;

use tracing::info;

use crate::config::{AnalysisConfig, ValidationConfig};
use crate::error::Result;
use super::graph::{GraphBuilder, TemporalGraph, TwoPassGraphBuilder};
use super::registry::{RegistryScanner, WorkerRegistrationScanner};
use super::validator::{GraphValidator, StructuralValidator, ValidationResult};
use super::walker::SourceWalker;
use super::{CancellationToken, GoSourceParser};

/// Inputs of one directory analysis
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOptions {
    pub root_dir: PathBuf,
    pub include_tests: bool,
    /// Regex on the package name; an invalid pattern matches nothing
    pub filter_package: Option<String>,
    /// Regex on the bare or qualified declaration name
    pub filter_name: Option<String>,
    /// Directory basenames whose subtrees are skipped
    pub exclude_dirs: Vec<String>,
}

impl AnalysisOptions {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            include_tests: false,
            filter_package: None,
            filter_name: None,
            exclude_dirs: Vec::new(),
        }
    }
}

impl From<&AnalysisConfig> for AnalysisOptions {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            root_dir: config.root_dir.clone(),
            include_tests: config.include_tests,
            filter_package: config.filter_package.clone(),
            filter_name: config.filter_name.clone(),
            exclude_dirs: config.exclude_dirs.clone(),
        }
    }
}

/// Scan, classify, extract, build; then validate on request
pub struct WorkflowAnalyzer {
    scanner: Box<dyn RegistryScanner + Send + Sync>,
    builder: Box<dyn GraphBuilder + Send + Sync>,
    validator: Box<dyn GraphValidator + Send + Sync>,
}

impl WorkflowAnalyzer {
    pub fn new(validation: &ValidationConfig) -> Self {
        Self::with_components(
            Box::new(WorkerRegistrationScanner::new()),
            Box::new(TwoPassGraphBuilder::new()),
            Box::new(StructuralValidator::new(validation)),
        )
    }

    pub fn with_components(
        scanner: Box<dyn RegistryScanner + Send + Sync>,
        builder: Box<dyn GraphBuilder + Send + Sync>,
        validator: Box<dyn GraphValidator + Send + Sync>,
    ) -> Self {
        Self {
            scanner,
            builder,
            validator,
        }
    }

    pub fn analyze_directory(&self, options: &AnalysisOptions, cancel: &CancellationToken) -> Result<TemporalGraph> {
        let mut parser = GoSourceParser::new()?;
        let files = parser.parse_directory(options, cancel)?;
        info!("Parsed {} Go files under {}", files.len(), options.root_dir.display());

        let registry = self.scanner.scan(&files, cancel)?;
        if registry.is_empty() {
            info!("No worker registrations found, classifying by signature only");
        } else {
            info!("Found {} worker registrations", registry.registrations().len());
        }

        let walker = SourceWalker::new(options.filter_package.as_deref(), options.filter_name.as_deref());
        let declarations = walker.walk(&files, &registry, cancel)?;
        info!("Classified {} declarations", declarations.len());

        self.builder.build(declarations, cancel)
    }

    pub fn validate(&self, graph: &TemporalGraph, cancel: &CancellationToken) -> Result<ValidationResult> {
        self.validator.validate(graph, cancel)
    }
}

impl Default for WorkflowAnalyzer {
    fn default() -> Self {
        Self::new(&ValidationConfig::default())
    }
}
