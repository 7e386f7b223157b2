// src/core/graph/stats.rs
use std::collections::HashSet;

use crate::core::CancellationToken;
use crate::error::Result;
use super::model::{GraphStats, NodeRole, TemporalGraph};

/// Aggregate counters over a finished graph.
///
/// Signal, query and update totals add the handler nodes of that role to
/// the definitions nested in every node, so a named handler counts twice.
pub fn compute_stats(graph: &TemporalGraph, cancel: &CancellationToken) -> Result<GraphStats> {
    let mut stats = GraphStats::default();

    for node in graph.nodes.values() {
        cancel.check()?;

        match node.role {
            NodeRole::Workflow => stats.total_workflows += 1,
            NodeRole::Activity => stats.total_activities += 1,
            NodeRole::SignalHandler => stats.total_signals += 1,
            NodeRole::QueryHandler => stats.total_queries += 1,
            NodeRole::UpdateHandler => stats.total_updates += 1,
        }

        stats.total_signals += node.signals.len();
        stats.total_queries += node.queries.len();
        stats.total_updates += node.updates.len();
        stats.total_timers += node.timers.len();
        stats.total_versions += node.versions.len();
        stats.total_search_attributes += node.search_attributes.len();

        if node.is_stub {
            stats.total_stubs += 1;
        }
        if node.is_orphan() {
            stats.orphan_nodes += 1;
        }

        let fan_out = node.fan_out();
        stats.total_call_sites += fan_out;
        stats.max_fan_out = stats.max_fan_out.max(fan_out);
    }

    if !graph.is_empty() {
        stats.avg_fan_out = stats.total_call_sites as f64 / graph.len() as f64;
    }

    for root in graph.sorted_names() {
        if graph.nodes[root].is_root() {
            stats.max_depth = stats.max_depth.max(chain_depth(graph, root, cancel)?);
        }
    }

    Ok(stats)
}

/// Number of nodes on the longest call path starting at `root`.
///
/// A node may appear on several independent paths; it is only skipped when
/// it is already on the path being explored.
pub fn chain_depth(graph: &TemporalGraph, root: &str, cancel: &CancellationToken) -> Result<usize> {
    if !graph.nodes.contains_key(root) {
        return Ok(0);
    }
    let mut on_path = HashSet::new();
    longest_path(graph, root, &mut on_path, cancel)
}

fn longest_path<'g>(
    graph: &'g TemporalGraph,
    name: &'g str,
    on_path: &mut HashSet<&'g str>,
    cancel: &CancellationToken,
) -> Result<usize> {
    cancel.check()?;
    on_path.insert(name);

    let mut callees: Vec<&str> = graph.callees(name).collect();
    callees.sort_unstable();
    callees.dedup();

    let mut deepest = 0;
    for callee in callees {
        if on_path.contains(callee) {
            continue;
        }
        deepest = deepest.max(longest_path(graph, callee, on_path, cancel)?);
    }

    on_path.remove(name);
    Ok(deepest + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::{CallRole, CallSite, Resolution, TemporalNode, TimerDef};

    fn call(target: &str) -> CallSite {
        CallSite {
            target_name: target.to_string(),
            target_role: CallRole::Activity,
            line: 1,
            options: None,
            argument_count: 0,
            argument_types: Vec::new(),
            result_type: None,
            resolution: Resolution::Exact,
        }
    }

    fn graph_of(edges: &[(&str, &str)], names: &[&str]) -> TemporalGraph {
        let mut graph = TemporalGraph::new();
        for name in names {
            graph.nodes.insert(name.to_string(), TemporalNode::new(*name, NodeRole::Workflow));
        }
        for (from, to) in edges {
            graph.nodes.get_mut(*from).unwrap().call_sites.push(call(to));
            graph.nodes.get_mut(*to).unwrap().add_parent(from);
        }
        graph
    }

    #[test]
    fn test_depth_counts_nodes() {
        let cancel = CancellationToken::new();
        let graph = graph_of(&[("A", "B"), ("B", "C")], &["A", "B", "C"]);
        assert_eq!(chain_depth(&graph, "A", &cancel).unwrap(), 3);
        assert_eq!(chain_depth(&graph, "C", &cancel).unwrap(), 1);
        assert_eq!(chain_depth(&graph, "missing", &cancel).unwrap(), 0);
    }

    #[test]
    fn test_shared_node_on_independent_paths() {
        // A -> B -> D, A -> C -> D -> E
        let cancel = CancellationToken::new();
        let graph = graph_of(
            &[("A", "B"), ("A", "C"), ("B", "D"), ("C", "D"), ("D", "E")],
            &["A", "B", "C", "D", "E"],
        );
        assert_eq!(chain_depth(&graph, "A", &cancel).unwrap(), 4);
    }

    #[test]
    fn test_cycle_terminates() {
        let cancel = CancellationToken::new();
        let graph = graph_of(&[("A", "B"), ("B", "C"), ("C", "A")], &["A", "B", "C"]);
        assert_eq!(chain_depth(&graph, "A", &cancel).unwrap(), 3);

        let stats = compute_stats(&graph, &cancel).unwrap();
        assert_eq!(stats.max_depth, 0);
    }

    #[test]
    fn test_counters() {
        let cancel = CancellationToken::new();
        let mut graph = graph_of(&[("A", "B"), ("A", "C")], &["A", "B", "C", "Lonely"]);
        graph.nodes.get_mut("B").unwrap().role = NodeRole::Activity;
        graph.nodes.get_mut("C").unwrap().is_stub = true;
        graph.nodes.get_mut("A").unwrap().timers.push(TimerDef {
            duration: "time.Minute".to_string(),
            is_sleep: true,
            line: 4,
        });

        let stats = compute_stats(&graph, &cancel).unwrap();
        assert_eq!(stats.total_workflows, 3);
        assert_eq!(stats.total_activities, 1);
        assert_eq!(stats.total_stubs, 1);
        assert_eq!(stats.total_timers, 1);
        assert_eq!(stats.total_call_sites, 2);
        assert_eq!(stats.max_fan_out, 2);
        assert_eq!(stats.avg_fan_out, 0.5);
        assert_eq!(stats.orphan_nodes, 1);
        assert_eq!(stats.max_depth, 2);
    }

    #[test]
    fn test_empty_graph() {
        let stats = compute_stats(&TemporalGraph::new(), &CancellationToken::new()).unwrap();
        assert_eq!(stats, GraphStats::default());
    }
}
