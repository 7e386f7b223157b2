// src/core/mod.rs
mod analyzer;
mod cancellation;
mod engine;
mod parser;
mod persistence;
mod validator;

// Syntax tree helpers shared by the pipeline stages
pub mod syntax;

// Pipeline stages, leaves first
pub mod registry;
pub mod classifier;
pub mod extractor;
pub mod walker;
pub mod graph;

pub use analyzer::{AnalysisOptions, WorkflowAnalyzer};
pub use cancellation::CancellationToken;
pub use parser::{GoSourceParser, ParsedFile, SdkImports};
pub use persistence::{GraphStore, JsonGraphStore};
pub use validator::{
    GraphValidator, IssueType, StructuralValidator, ValidationIssue, ValidationResult,
};

pub use graph::{GraphStats, NodeRole, TemporalGraph, TemporalNode};
pub use walker::{DeclarationMatch, SourceWalker};

// Export the main engine
pub use engine::{AnalyzeRequest, Engine};
