// src/core/persistence.rs
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::Result;
use super::graph::TemporalGraph;

/// Load and save of finished graph documents
pub trait GraphStore {
    fn save(&self, graph: &TemporalGraph, path: &Path) -> Result<()>;

    fn load(&self, path: &Path) -> Result<TemporalGraph>;
}

/// `{ "nodes": {...}, "stats": {...} }` as JSON
pub struct JsonGraphStore {
    pub pretty: bool,
}

impl JsonGraphStore {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl GraphStore for JsonGraphStore {
    fn save(&self, graph: &TemporalGraph, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = if self.pretty {
            serde_json::to_string_pretty(graph)?
        } else {
            serde_json::to_string(graph)?
        };
        fs::write(path, content)?;

        debug!("Saved {} nodes to {}", graph.len(), path.display());
        Ok(())
    }

    fn load(&self, path: &Path) -> Result<TemporalGraph> {
        let content = fs::read_to_string(path)?;
        let graph: TemporalGraph = serde_json::from_str(&content)?;
        debug!("Loaded {} nodes from {}", graph.len(), path.display());
        Ok(graph)
    }
}
