use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AnalyzerError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Source tree analysis settings
    pub analysis: AnalysisConfig,

    /// Graph validation thresholds
    pub validation: ValidationConfig,

    /// Output settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisConfig {
    /// Root directory of the Go source tree
    pub root_dir: PathBuf,

    /// Whether `_test.go` files take part in the analysis
    pub include_tests: bool,

    /// Regular expression a declaration's package name must match
    pub filter_package: Option<String>,

    /// Regular expression a declaration's name must match
    pub filter_name: Option<String>,

    /// Directory basenames pruned from the walk (exact match)
    pub exclude_dirs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationConfig {
    /// Chains deeper than this are reported
    pub max_depth: usize,

    /// Nodes with more call sites than this are reported
    pub max_fan_out: usize,

    /// Compare call-site payloads with target parameter lists
    pub check_signatures: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    /// Where `analyze` writes the graph document
    pub graph_file: PathBuf,

    /// Pretty-print the graph document
    pub pretty: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            analysis: AnalysisConfig::default(),
            validation: ValidationConfig::default(),
            output: OutputConfig {
                graph_file: PathBuf::from("temporal-graph.json"),
                pretty: true,
            },
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            include_tests: false,
            filter_package: None,
            filter_name: None,
            exclude_dirs: vec![
                "vendor".to_string(),
                ".git".to_string(),
                "node_modules".to_string(),
            ],
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_depth: 10,
            max_fan_out: 20,
            check_signatures: true,
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| AnalyzerError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| AnalyzerError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => {
                if p.as_ref().exists() {
                    Self::load(p)
                } else {
                    Ok(Self::default())
                }
            }
            None => {
                let candidates = [
                    "temporal-analyzer.toml",
                    "TemporalAnalyzer.toml",
                    ".temporal-analyzer.toml",
                ];

                for candidate in &candidates {
                    if Path::new(candidate).exists() {
                        return Self::load(candidate);
                    }
                }

                Ok(Self::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("temporal-analyzer.toml");

        let mut config = Config::default();
        config.analysis.filter_package = Some("^orders$".to_string());
        config.validation.max_fan_out = 12;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_explicit_path_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(Some(dir.path().join("nope.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "analysis = 3").unwrap();

        match Config::load(&path) {
            Err(AnalyzerError::Config(_)) => {}
            other => panic!("expected config error, got {:?}", other),
        }
    }
}
