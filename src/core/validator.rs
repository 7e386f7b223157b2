// src/core/validator.rs
//! Structural checks over a finished graph.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ValidationConfig;
use crate::error::Result;
use super::graph::{chain_depth, TemporalGraph, TemporalNode};
use super::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueType {
    Warning,
    Error,
    Info,
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            IssueType::Warning => "warning",
            IssueType::Error => "error",
            IssueType::Info => "info",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    /// 1 to 10, fixed per check
    pub severity: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    fn warning(node: &str, severity: u8, message: String, suggestion: &str) -> Self {
        Self {
            issue_type: IssueType::Warning,
            message,
            node_name: Some(node.to_string()),
            severity,
            suggestion: Some(suggestion.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.issue_type == IssueType::Error
    }
}

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        !self.issues.iter().any(|issue| issue.is_error())
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|issue| issue.issue_type == IssueType::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|issue| issue.issue_type == IssueType::Warning)
    }
}

pub trait GraphValidator {
    fn validate(&self, graph: &TemporalGraph, cancel: &CancellationToken) -> Result<ValidationResult>;
}

/// Orphans, cycles, deep chains, high fan-out and payload mismatches
pub struct StructuralValidator {
    max_depth: usize,
    max_fan_out: usize,
    check_signatures: bool,
}

impl StructuralValidator {
    pub fn new(config: &ValidationConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            max_fan_out: config.max_fan_out,
            check_signatures: config.check_signatures,
        }
    }

    fn check_orphans(&self, graph: &TemporalGraph, issues: &mut Vec<ValidationIssue>, cancel: &CancellationToken) -> Result<()> {
        for name in graph.sorted_names() {
            cancel.check()?;
            if graph.nodes[name].is_orphan() {
                issues.push(ValidationIssue::warning(
                    name,
                    3,
                    format!("{} is never called and calls nothing", name),
                    "Remove it or wire it into a workflow",
                ));
            }
        }
        Ok(())
    }

    fn check_cycles(&self, graph: &TemporalGraph, issues: &mut Vec<ValidationIssue>, cancel: &CancellationToken) -> Result<()> {
        let mut search = CycleSearch::default();
        for name in graph.sorted_names() {
            if !search.visited.contains(name.as_str()) {
                search.visit(graph, name, cancel)?;
            }
        }

        for cycle in search.cycles {
            let mut path = cycle.join(" -> ");
            if let Some(first) = cycle.first() {
                path.push_str(" -> ");
                path.push_str(first);
            }
            issues.push(ValidationIssue {
                issue_type: IssueType::Error,
                message: format!("Call cycle detected: {}", path),
                node_name: cycle.first().map(|name| name.to_string()),
                severity: 8,
                suggestion: Some("Break the cycle; use continue-as-new for intentional recursion".to_string()),
            });
        }
        Ok(())
    }

    fn check_deep_chains(&self, graph: &TemporalGraph, issues: &mut Vec<ValidationIssue>, cancel: &CancellationToken) -> Result<()> {
        for name in graph.sorted_names() {
            if !graph.nodes[name].is_root() {
                continue;
            }
            let depth = chain_depth(graph, name, cancel)?;
            if depth > self.max_depth {
                issues.push(ValidationIssue::warning(
                    name,
                    5,
                    format!("Call chain from {} is {} levels deep (limit {})", name, depth, self.max_depth),
                    "Flatten the chain or split it into child workflows",
                ));
            }
        }
        Ok(())
    }

    fn check_fan_out(&self, graph: &TemporalGraph, issues: &mut Vec<ValidationIssue>, cancel: &CancellationToken) -> Result<()> {
        for name in graph.sorted_names() {
            cancel.check()?;
            let fan_out = graph.nodes[name].fan_out();
            if fan_out > self.max_fan_out {
                issues.push(ValidationIssue::warning(
                    name,
                    4,
                    format!("{} makes {} calls (limit {})", name, fan_out, self.max_fan_out),
                    "Group related calls into a child workflow",
                ));
            }
        }
        Ok(())
    }

    fn check_arguments(&self, graph: &TemporalGraph, issues: &mut Vec<ValidationIssue>, cancel: &CancellationToken) -> Result<()> {
        for name in graph.sorted_names() {
            for site in &graph.nodes[name].call_sites {
                cancel.check()?;
                let Some(target) = graph.get(&site.target_name) else {
                    continue;
                };
                let Some(expected) = payload_arity(target) else {
                    continue;
                };
                if site.argument_count != expected {
                    issues.push(ValidationIssue::warning(
                        name,
                        6,
                        format!(
                            "{} passes {} argument(s) to {} at line {}, which takes {}",
                            name, site.argument_count, target.name, site.line, expected
                        ),
                        "Match the call's arguments to the target's parameters",
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Parameter count a caller must supply, leading context excluded. `None`
/// when it cannot be checked.
fn payload_arity(target: &TemporalNode) -> Option<usize> {
    if target.is_stub || target.parameters.is_empty() {
        return None;
    }
    if target.parameters.iter().any(|p| p.type_name.starts_with("...")) {
        return None;
    }
    let takes_context = target
        .parameters
        .first()
        .map(|p| p.type_name.ends_with("Context"))
        .unwrap_or(false);
    Some(target.parameters.len() - usize::from(takes_context))
}

#[derive(Default)]
struct CycleSearch<'g> {
    visited: HashSet<&'g str>,
    on_stack: HashSet<&'g str>,
    path: Vec<&'g str>,
    cycles: Vec<Vec<&'g str>>,
}

impl<'g> CycleSearch<'g> {
    fn visit(&mut self, graph: &'g TemporalGraph, name: &'g str, cancel: &CancellationToken) -> Result<()> {
        cancel.check()?;
        self.visited.insert(name);
        self.on_stack.insert(name);
        self.path.push(name);

        let mut callees: Vec<&str> = graph.callees(name).collect();
        callees.sort_unstable();
        callees.dedup();

        for callee in callees {
            if !self.visited.contains(callee) {
                self.visit(graph, callee, cancel)?;
            } else if self.on_stack.contains(callee) {
                if let Some(start) = self.path.iter().position(|n| *n == callee) {
                    debug!("Cycle through {}", callee);
                    self.cycles.push(self.path[start..].to_vec());
                }
            }
        }

        self.on_stack.remove(name);
        self.path.pop();
        Ok(())
    }
}

impl GraphValidator for StructuralValidator {
    fn validate(&self, graph: &TemporalGraph, cancel: &CancellationToken) -> Result<ValidationResult> {
        let mut issues = Vec::new();

        self.check_orphans(graph, &mut issues, cancel)?;
        self.check_cycles(graph, &mut issues, cancel)?;
        self.check_deep_chains(graph, &mut issues, cancel)?;
        self.check_fan_out(graph, &mut issues, cancel)?;
        if self.check_signatures {
            self.check_arguments(graph, &mut issues, cancel)?;
        }

        Ok(ValidationResult { issues })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::{CallRole, CallSite, NodeRole, ParameterInfo, Resolution};

    fn call(target: &str, argument_count: usize) -> CallSite {
        CallSite {
            target_name: target.to_string(),
            target_role: CallRole::Activity,
            line: 10,
            options: None,
            argument_count,
            argument_types: Vec::new(),
            result_type: None,
            resolution: Resolution::Exact,
        }
    }

    fn graph_of(edges: &[(&str, &str)]) -> TemporalGraph {
        let mut graph = TemporalGraph::new();
        for (from, to) in edges {
            for name in [from, to] {
                graph
                    .nodes
                    .entry(name.to_string())
                    .or_insert_with(|| TemporalNode::new(*name, NodeRole::Workflow));
            }
            graph.nodes.get_mut(*from).unwrap().call_sites.push(call(to, 0));
            graph.nodes.get_mut(*to).unwrap().add_parent(from);
        }
        graph
    }

    fn chain(nodes: usize) -> TemporalGraph {
        let names: Vec<String> = (0..nodes).map(|i| format!("N{:02}", i)).collect();
        let edges: Vec<(&str, &str)> = names
            .windows(2)
            .map(|pair| (pair[0].as_str(), pair[1].as_str()))
            .collect();
        graph_of(&edges)
    }

    fn validate(graph: &TemporalGraph) -> Vec<ValidationIssue> {
        StructuralValidator::new(&ValidationConfig::default())
            .validate(graph, &CancellationToken::new())
            .unwrap()
            .issues
    }

    fn with_severity(issues: &[ValidationIssue], severity: u8) -> Vec<&ValidationIssue> {
        issues.iter().filter(|issue| issue.severity == severity).collect()
    }

    #[test]
    fn test_cycle_detected() {
        let issues = validate(&graph_of(&[("A", "B"), ("B", "C"), ("C", "A")]));
        let cycles = with_severity(&issues, 8);
        assert_eq!(cycles.len(), 1);
        assert!(cycles[0].is_error());
        assert_eq!(cycles[0].message, "Call cycle detected: A -> B -> C -> A");
    }

    #[test]
    fn test_no_cycle_without_back_edge() {
        let issues = validate(&graph_of(&[("A", "B"), ("B", "C")]));
        assert!(with_severity(&issues, 8).is_empty());
        assert!(issues.iter().all(|issue| !issue.is_error()));
    }

    #[test]
    fn test_self_call_is_a_cycle() {
        let issues = validate(&graph_of(&[("Loop", "Loop")]));
        assert_eq!(with_severity(&issues, 8).len(), 1);
    }

    #[test]
    fn test_fan_out_threshold() {
        let mut graph = TemporalGraph::new();
        let mut busy = TemporalNode::new("Busy", NodeRole::Workflow);
        busy.call_sites = (0..25).map(|i| call(&format!("Act{}", i), 0)).collect();
        let mut calm = TemporalNode::new("Calm", NodeRole::Workflow);
        calm.call_sites = (0..20).map(|i| call(&format!("Act{}", i), 0)).collect();
        graph.nodes.insert("Busy".to_string(), busy);
        graph.nodes.insert("Calm".to_string(), calm);

        let issues = validate(&graph);
        let fan_out = with_severity(&issues, 4);
        assert_eq!(fan_out.len(), 1);
        assert_eq!(fan_out[0].node_name.as_deref(), Some("Busy"));
    }

    #[test]
    fn test_deep_chain_boundary() {
        let deep = validate(&chain(15));
        let flagged = with_severity(&deep, 5);
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].node_name.as_deref(), Some("N00"));

        assert_eq!(with_severity(&validate(&chain(11)), 5).len(), 1);
        assert!(with_severity(&validate(&chain(10)), 5).is_empty());
    }

    #[test]
    fn test_orphans() {
        let mut graph = graph_of(&[("A", "B")]);
        graph.nodes.insert("Lonely".to_string(), TemporalNode::new("Lonely", NodeRole::Activity));

        let result = validate(&graph);
        let orphans = with_severity(&result, 3);
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].node_name.as_deref(), Some("Lonely"));
    }

    #[test]
    fn test_argument_mismatch() {
        let mut graph = graph_of(&[("Flow", "Charge"), ("Flow", "Notify")]);
        graph.nodes.get_mut("Flow").unwrap().call_sites[0].argument_count = 1;
        graph.nodes.get_mut("Flow").unwrap().call_sites[1].argument_count = 1;
        graph.nodes.get_mut("Charge").unwrap().parameters = vec![
            ParameterInfo { name: "ctx".to_string(), type_name: "context.Context".to_string() },
            ParameterInfo { name: "id".to_string(), type_name: "string".to_string() },
            ParameterInfo { name: "amount".to_string(), type_name: "int".to_string() },
        ];
        graph.nodes.get_mut("Notify").unwrap().parameters = vec![
            ParameterInfo { name: "ctx".to_string(), type_name: "context.Context".to_string() },
            ParameterInfo { name: "to".to_string(), type_name: "string".to_string() },
        ];

        let result = validate(&graph);
        let mismatches = with_severity(&result, 6);
        assert_eq!(mismatches.len(), 1);
        assert!(mismatches[0].message.contains("Charge"));

        let config = ValidationConfig {
            check_signatures: false,
            ..ValidationConfig::default()
        };
        let quiet = StructuralValidator::new(&config)
            .validate(&graph, &CancellationToken::new())
            .unwrap();
        assert!(with_severity(&quiet.issues, 6).is_empty());
    }

    #[test]
    fn test_issue_serialization() {
        let issues = validate(&graph_of(&[("A", "A")]));
        let json = serde_json::to_value(&issues[0]).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["severity"], 8);
        assert_eq!(json["node_name"], "A");
    }

    #[test]
    fn test_cancelled_validation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = StructuralValidator::new(&ValidationConfig::default())
            .validate(&graph_of(&[("A", "B")]), &cancel);
        assert!(matches!(result, Err(crate::error::AnalyzerError::Cancelled)));
    }
}
