use clap::{Parser, Subcommand};
use std::path::PathBuf;
use anyhow::Result;

use temporal_analyzer::core::{AnalyzeRequest, Engine};

#[derive(Parser)]
#[command(name = "temporal-analyzer")]
#[command(about = "Static analysis of Temporal workflows and activities in Go code")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default configuration file
    Init {
        /// Target directory (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Build the workflow graph of a Go source tree
    Analyze {
        /// Source directory to analyze
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Where to write the graph document
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Include _test.go files
        #[arg(long)]
        include_tests: bool,

        /// Only keep declarations whose package matches this regex
        #[arg(long)]
        filter_package: Option<String>,

        /// Only keep declarations whose name matches this regex
        #[arg(long)]
        filter_name: Option<String>,

        /// Additional directory names to skip (repeatable)
        #[arg(long = "exclude")]
        exclude_dirs: Vec<String>,

        /// Validate the graph after building it
        #[arg(long)]
        validate: bool,

        /// With --validate, fail on warnings as well as errors
        #[arg(long, requires = "validate")]
        strict: bool,
    },

    /// Check a graph for orphans, cycles, deep chains and high fan-out
    Validate {
        /// Saved graph document (defaults to the configured output file)
        #[arg(short, long, conflicts_with = "source")]
        graph: Option<PathBuf>,

        /// Analyze this directory instead of loading a saved graph
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Fail on warnings as well as errors
        #[arg(long)]
        strict: bool,
    },

    /// Print the statistics of a saved graph
    Stats {
        /// Saved graph document (defaults to the configured output file)
        #[arg(short, long)]
        graph: Option<PathBuf>,
    },
}

impl Cli {
    pub async fn execute(self, engine: Engine) -> Result<()> {
        match self.command {
            Commands::Init { path, force } => {
                engine.init(path, force).await
            }
            Commands::Analyze {
                source,
                output,
                include_tests,
                filter_package,
                filter_name,
                exclude_dirs,
                validate,
                strict,
            } => {
                let request = AnalyzeRequest {
                    source,
                    output,
                    include_tests,
                    filter_package,
                    filter_name,
                    exclude_dirs,
                    validate,
                    strict,
                };
                engine.analyze(request).await.map(|_| ())
            }
            Commands::Validate { graph, source, strict } => {
                engine.validate(graph, source, strict).await
            }
            Commands::Stats { graph } => {
                engine.stats(graph).await
            }
        }
    }
}
