use thiserror::Error;

/// Main error type for temporal-analyzer operations
#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parser error: {0}")]
    Parser(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("File system error: {0}")]
    FileSystem(String),

    #[error("Analysis cancelled")]
    Cancelled,

    #[error("Graph validation failed: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;
