// src/core/graph/mod.rs
//! Workflow graph model, construction and statistics.

mod builder;
mod model;
mod stats;

pub use builder::{GraphBuilder, TwoPassGraphBuilder};
pub use model::*;
pub use stats::{chain_depth, compute_stats};
