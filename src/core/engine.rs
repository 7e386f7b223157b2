// src/core/engine.rs
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::AnalyzerError;
use super::{
    AnalysisOptions, CancellationToken, GraphStore, JsonGraphStore, StructuralValidator,
    GraphValidator, TemporalGraph, ValidationResult, WorkflowAnalyzer,
};

const DEFAULT_CONFIG_FILE: &str = "temporal-analyzer.toml";

/// Command-line overrides for one `analyze` run
#[derive(Debug, Clone, Default)]
pub struct AnalyzeRequest {
    pub source: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub include_tests: bool,
    pub filter_package: Option<String>,
    pub filter_name: Option<String>,
    pub exclude_dirs: Vec<String>,
    pub validate: bool,
    pub strict: bool,
}

/// Main orchestration engine behind the CLI commands
pub struct Engine {
    config: Config,
}

impl Engine {
    pub async fn new(config_path: Option<&Path>) -> Result<Self> {
        let config = Config::load_or_default(config_path)?;
        debug!("Loaded configuration: {:?}", config);
        Ok(Self { config })
    }

    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Write a default configuration file
    pub async fn init(&self, path: Option<PathBuf>, force: bool) -> Result<()> {
        let target_dir = match path {
            Some(path) => path,
            None => std::env::current_dir().context("Cannot determine current directory")?,
        };
        let config_file = target_dir.join(DEFAULT_CONFIG_FILE);
        info!("Initializing temporal-analyzer in: {}", target_dir.display());

        if config_file.exists() && !force {
            warn!("⚠️ {} already exists, use --force to overwrite", config_file.display());
            return Ok(());
        }

        std::fs::create_dir_all(&target_dir)
            .with_context(|| format!("Cannot create {}", target_dir.display()))?;
        Config::default().save(&config_file)?;
        info!("✅ Wrote {}", config_file.display());
        Ok(())
    }

    /// Run the pipeline, report it and save the graph document
    pub async fn analyze(&self, request: AnalyzeRequest) -> Result<TemporalGraph> {
        let options = self.analysis_options(&request);
        let output = request
            .output
            .clone()
            .unwrap_or_else(|| self.config.output.graph_file.clone());

        info!("🔍 Analyzing Temporal workflows in {}", options.root_dir.display());
        let graph = self.run_analysis(options).await?;
        log_summary(&graph);

        JsonGraphStore::new(self.config.output.pretty).save(&graph, &output)?;
        info!("💾 Graph written to {}", output.display());

        if request.validate {
            let result = self.run_validation(graph.clone()).await?;
            report_issues(&result, request.strict)?;
        }

        Ok(graph)
    }

    /// Validate a saved graph, or a fresh analysis of `source`
    pub async fn validate(&self, graph_file: Option<PathBuf>, source: Option<PathBuf>, strict: bool) -> Result<()> {
        let graph = match source {
            Some(source) => {
                let request = AnalyzeRequest {
                    source: Some(source),
                    ..AnalyzeRequest::default()
                };
                self.run_analysis(self.analysis_options(&request)).await?
            }
            None => self.load_graph(graph_file)?,
        };

        info!("✅ Validating {} nodes...", graph.len());
        let result = self.run_validation(graph).await?;
        report_issues(&result, strict)
    }

    /// Print the statistics of a saved graph
    pub async fn stats(&self, graph_file: Option<PathBuf>) -> Result<()> {
        let graph = self.load_graph(graph_file)?;
        log_summary(&graph);

        let stats = &graph.stats;
        info!("  - {} signals, {} queries, {} updates", stats.total_signals, stats.total_queries, stats.total_updates);
        info!("  - {} timers, {} versions, {} search attributes", stats.total_timers, stats.total_versions, stats.total_search_attributes);
        info!("  - fan-out: max {}, avg {:.2}", stats.max_fan_out, stats.avg_fan_out);
        info!("  - {} orphan nodes, max depth {}", stats.orphan_nodes, stats.max_depth);
        Ok(())
    }

    fn analysis_options(&self, request: &AnalyzeRequest) -> AnalysisOptions {
        let mut options = AnalysisOptions::from(&self.config.analysis);
        if let Some(source) = &request.source {
            options.root_dir = source.clone();
        }
        if request.include_tests {
            options.include_tests = true;
        }
        if request.filter_package.is_some() {
            options.filter_package = request.filter_package.clone();
        }
        if request.filter_name.is_some() {
            options.filter_name = request.filter_name.clone();
        }
        for dir in &request.exclude_dirs {
            if !options.exclude_dirs.contains(dir) {
                options.exclude_dirs.push(dir.clone());
            }
        }
        options
    }

    fn load_graph(&self, graph_file: Option<PathBuf>) -> Result<TemporalGraph> {
        let path = graph_file.unwrap_or_else(|| self.config.output.graph_file.clone());
        JsonGraphStore::new(self.config.output.pretty)
            .load(&path)
            .with_context(|| format!("Failed to load graph from {}", path.display()))
    }

    async fn run_analysis(&self, options: AnalysisOptions) -> Result<TemporalGraph> {
        let validation = self.config.validation.clone();
        run_cancellable(move |cancel| WorkflowAnalyzer::new(&validation).analyze_directory(&options, cancel))
            .await
            .context("Analysis failed")
    }

    async fn run_validation(&self, graph: TemporalGraph) -> Result<ValidationResult> {
        let validator = StructuralValidator::new(&self.config.validation);
        run_cancellable(move |cancel| validator.validate(&graph, cancel))
            .await
            .context("Validation failed")
    }
}

/// Run a synchronous pipeline step off the async runtime; Ctrl-C trips the
/// token the step polls.
async fn run_cancellable<T, F>(job: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&CancellationToken) -> crate::error::Result<T> + Send + 'static,
{
    let cancel = CancellationToken::new();

    let interrupt = cancel.clone();
    let listener = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("🛑 Interrupt received, cancelling...");
            interrupt.cancel();
        }
    });

    let outcome = tokio::task::spawn_blocking(move || job(&cancel)).await;
    listener.abort();

    let result = outcome.context("Analysis task panicked")?;
    Ok(result?)
}

fn log_summary(graph: &TemporalGraph) {
    let stats = &graph.stats;
    info!("📊 Analysis complete:");
    info!("  - {} workflows", stats.total_workflows);
    info!("  - {} activities", stats.total_activities);
    info!("  - {} call sites", stats.total_call_sites);
    if stats.total_stubs > 0 {
        info!("  - {} unresolved targets synthesized as stubs", stats.total_stubs);
    }
}

/// Log every issue; fail on errors, and on warnings too when strict
fn report_issues(result: &ValidationResult, strict: bool) -> Result<()> {
    if result.issues.is_empty() {
        info!("✅ No structural issues found");
        return Ok(());
    }

    for issue in &result.issues {
        let subject = issue.node_name.as_deref().unwrap_or("-");
        match &issue.suggestion {
            Some(suggestion) => warn!(
                "[{} {}] {}: {} ({})",
                issue.issue_type, issue.severity, subject, issue.message, suggestion
            ),
            None => warn!("[{} {}] {}: {}", issue.issue_type, issue.severity, subject, issue.message),
        }
    }

    let errors = result.errors().count();
    let warnings = result.warnings().count();
    info!("Found {} errors and {} warnings", errors, warnings);

    if errors > 0 {
        return Err(AnalyzerError::Validation(format!("{} structural errors", errors)).into());
    }
    if strict && warnings > 0 {
        return Err(AnalyzerError::Validation(format!("{} warnings in strict mode", warnings)).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{IssueType, ValidationIssue};

    fn issue(issue_type: IssueType) -> ValidationIssue {
        ValidationIssue {
            issue_type,
            message: "test".to_string(),
            node_name: None,
            severity: 3,
            suggestion: None,
        }
    }

    #[test]
    fn test_report_issues_strictness() {
        let warnings = ValidationResult { issues: vec![issue(IssueType::Warning)] };
        assert!(report_issues(&warnings, false).is_ok());
        assert!(report_issues(&warnings, true).is_err());

        let errors = ValidationResult { issues: vec![issue(IssueType::Error)] };
        assert!(report_issues(&errors, false).is_err());
    }

    #[test]
    fn test_request_overrides_config() {
        let engine = Engine::with_config(Config::default());
        let options = engine.analysis_options(&AnalyzeRequest {
            source: Some(PathBuf::from("/src/app")),
            exclude_dirs: vec!["gen".to_string(), "vendor".to_string()],
            ..AnalyzeRequest::default()
        });
        assert_eq!(options.root_dir, PathBuf::from("/src/app"));
        assert_eq!(options.exclude_dirs, vec!["vendor", ".git", "node_modules", "gen"]);
    }

    #[tokio::test]
    async fn test_init_writes_default_config() {
        let temp = tempfile::tempdir().unwrap();
        let engine = Engine::with_config(Config::default());
        engine.init(Some(temp.path().to_path_buf()), false).await.unwrap();

        let written = Config::load(temp.path().join(DEFAULT_CONFIG_FILE)).unwrap();
        assert_eq!(written, Config::default());
    }
}
