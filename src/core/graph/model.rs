// src/core/graph/model.rs
use std::collections::HashMap;
use std::fmt;
use serde::{Serialize, Deserialize};

/// Role of a node in the workflow graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    Workflow,
    Activity,
    SignalHandler,
    QueryHandler,
    UpdateHandler,
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NodeRole::Workflow => "workflow",
            NodeRole::Activity => "activity",
            NodeRole::SignalHandler => "signal_handler",
            NodeRole::QueryHandler => "query_handler",
            NodeRole::UpdateHandler => "update_handler",
        };
        f.write_str(label)
    }
}

/// What an `Execute*` call site starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallRole {
    Activity,
    LocalActivity,
    ChildWorkflow,
}

impl CallRole {
    /// Role a synthesized stub for this kind of call receives
    pub fn stub_role(&self) -> NodeRole {
        match self {
            CallRole::Activity | CallRole::LocalActivity => NodeRole::Activity,
            CallRole::ChildWorkflow => NodeRole::Workflow,
        }
    }
}

/// How a call site's target was matched to a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Not yet seen by the builder
    Pending,
    Exact,
    /// Unique `.Method` suffix match
    Suffix,
    /// Target synthesized as a stub node
    Stub,
    /// Several suffix candidates; left alone
    Unresolved,
}

/// Retry policy fields read from a literal options struct
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicyInfo {
    pub initial_interval: Option<String>,
    pub backoff_coefficient: Option<f64>,
    pub maximum_interval: Option<String>,
    pub maximum_attempts: Option<i64>,
}

/// Options attached through a `With*Options` wrapper
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallOptions {
    /// Options were passed but not as a literal we can read
    pub opaque: bool,
    pub start_to_close_timeout: Option<String>,
    pub schedule_to_close_timeout: Option<String>,
    pub schedule_to_start_timeout: Option<String>,
    pub heartbeat_timeout: Option<String>,
    pub task_queue: Option<String>,
    pub workflow_id: Option<String>,
    pub workflow_execution_timeout: Option<String>,
    pub workflow_run_timeout: Option<String>,
    pub retry_policy: Option<RetryPolicyInfo>,
}

/// Outgoing edge from a workflow to an activity or child workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSite {
    /// Target as written before resolution, the node key after
    pub target_name: String,
    pub target_role: CallRole,
    pub line: usize,
    pub options: Option<CallOptions>,
    /// Payload arguments (third position onward)
    pub argument_count: usize,
    pub argument_types: Vec<String>,
    /// Type behind a folded `.Get(ctx, &result)`
    pub result_type: Option<String>,
    pub resolution: Resolution,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalDef {
    pub name: String,
    pub handler: Option<String>,
    pub line: usize,
    /// Read through `GetSignalChannel` rather than a handler
    pub channel: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDef {
    pub name: String,
    pub handler: Option<String>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateDef {
    pub name: String,
    pub handler: Option<String>,
    pub line: usize,
    pub has_validator: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerDef {
    pub duration: String,
    pub is_sleep: bool,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionDef {
    pub change_id: String,
    pub min_version: Option<i64>,
    pub max_version: Option<i64>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchAttributeDef {
    pub name: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinueAsNewMarker {
    pub target: Option<String>,
    pub line: usize,
}

/// Non-SDK call kept for traceability only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternalCall {
    pub target: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterInfo {
    pub name: String,
    pub type_name: String,
}

/// A workflow, activity or handler in the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalNode {
    /// Qualified name: `Type.Method` for methods, bare name otherwise
    pub name: String,
    pub role: NodeRole,
    pub package: String,
    pub file_path: String,
    pub line_number: usize,
    pub description: Option<String>,
    pub parameters: Vec<ParameterInfo>,
    pub return_types: Vec<String>,
    pub call_sites: Vec<CallSite>,
    pub internal_calls: Vec<InternalCall>,
    /// Callers, deduplicated
    pub parents: Vec<String>,
    pub signals: Vec<SignalDef>,
    pub queries: Vec<QueryDef>,
    pub updates: Vec<UpdateDef>,
    pub timers: Vec<TimerDef>,
    pub search_attributes: Vec<SearchAttributeDef>,
    pub versions: Vec<VersionDef>,
    pub continue_as_new: Vec<ContinueAsNewMarker>,
    /// Synthesized for a target no declaration matched
    pub is_stub: bool,
}

impl TemporalNode {
    pub fn new(name: impl Into<String>, role: NodeRole) -> Self {
        Self {
            name: name.into(),
            role,
            package: String::new(),
            file_path: String::new(),
            line_number: 0,
            description: None,
            parameters: Vec::new(),
            return_types: Vec::new(),
            call_sites: Vec::new(),
            internal_calls: Vec::new(),
            parents: Vec::new(),
            signals: Vec::new(),
            queries: Vec::new(),
            updates: Vec::new(),
            timers: Vec::new(),
            search_attributes: Vec::new(),
            versions: Vec::new(),
            continue_as_new: Vec::new(),
            is_stub: false,
        }
    }

    /// Minimal placeholder with one parent
    pub fn stub(name: impl Into<String>, role: NodeRole, parent: &str) -> Self {
        let mut node = Self::new(name, role);
        node.is_stub = true;
        node.parents.push(parent.to_string());
        node
    }

    pub fn add_parent(&mut self, parent: &str) {
        if !self.parents.iter().any(|existing| existing == parent) {
            self.parents.push(parent.to_string());
        }
    }

    pub fn fan_out(&self) -> usize {
        self.call_sites.len()
    }

    /// No callers and no outgoing calls
    pub fn is_orphan(&self) -> bool {
        self.parents.is_empty() && self.call_sites.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }
}

/// Aggregate counters over the finished graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub total_workflows: usize,
    pub total_activities: usize,
    /// Handler nodes plus every node's signal definitions
    pub total_signals: usize,
    pub total_queries: usize,
    pub total_updates: usize,
    pub total_timers: usize,
    pub total_versions: usize,
    pub total_search_attributes: usize,
    pub total_stubs: usize,
    pub total_call_sites: usize,
    pub max_fan_out: usize,
    pub avg_fan_out: f64,
    pub orphan_nodes: usize,
    pub max_depth: usize,
}

/// The graph document: nodes keyed by qualified name plus statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemporalGraph {
    pub nodes: HashMap<String, TemporalNode>,
    pub stats: GraphStats,
}

impl TemporalGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&TemporalNode> {
        self.nodes.get(name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node keys in sorted order, for output that must be reproducible
    pub fn sorted_names(&self) -> Vec<&String> {
        let mut names: Vec<&String> = self.nodes.keys().collect();
        names.sort();
        names
    }

    /// Call-site targets of `name` that exist as nodes
    pub fn callees<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> + 'a {
        let nodes = &self.nodes;
        nodes
            .get(name)
            .into_iter()
            .flat_map(|node| node.call_sites.iter())
            .map(|site| site.target_name.as_str())
            .filter(move |target| nodes.contains_key(*target))
    }

    pub fn roots(&self) -> Vec<&TemporalNode> {
        self.nodes.values().filter(|node| node.is_root()).collect()
    }
}
