// src/core/graph/builder.rs
use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::core::extractor::ExtractedBody;
use crate::core::walker::DeclarationMatch;
use crate::core::CancellationToken;
use crate::error::Result;
use super::model::{CallSite, NodeRole, Resolution, TemporalGraph, TemporalNode};
use super::stats::compute_stats;

/// Target name recorded for inline function literals
const ANONYMOUS_TARGET: &str = "<anonymous>";

pub trait GraphBuilder {
    /// Consume the declarations of one analysis run and produce the graph
    fn build(&self, declarations: Vec<DeclarationMatch>, cancel: &CancellationToken) -> Result<TemporalGraph>;
}

/// Nodes first, then edges and metadata, then statistics
pub struct TwoPassGraphBuilder;

impl TwoPassGraphBuilder {
    pub fn new() -> Self {
        Self
    }

    /// First pass: one node per qualified name. Returns the accepted
    /// declarations' bodies in walk order, keyed by their node.
    fn create_nodes(
        &self,
        graph: &mut TemporalGraph,
        declarations: Vec<DeclarationMatch>,
        cancel: &CancellationToken,
    ) -> Result<Vec<(String, ExtractedBody)>> {
        let mut accepted = Vec::with_capacity(declarations.len());

        for declaration in declarations {
            cancel.check()?;

            let key = declaration.qualified_name();
            if declaration.name.is_empty() {
                warn!("Skipping unnamed declaration in {}", declaration.file_path.display());
                continue;
            }
            if graph.nodes.contains_key(&key) {
                warn!(
                    "Duplicate declaration {} in {}:{}, keeping the first one",
                    key,
                    declaration.file_path.display(),
                    declaration.line
                );
                continue;
            }

            let mut node = TemporalNode::new(key.clone(), declaration.role);
            node.package = declaration.package;
            node.file_path = declaration.file_path.display().to_string();
            node.line_number = declaration.line;
            node.description = declaration.description;
            node.parameters = declaration.parameters;
            node.return_types = declaration.return_types;

            graph.nodes.insert(key.clone(), node);
            accepted.push((key, declaration.body));
        }

        Ok(accepted)
    }

    /// Second pass: resolve call sites and handlers, attach metadata.
    /// Every call site is resolved before any handler node is synthesized,
    /// so a handler never stands in for a call target's stub.
    fn attach_edges(
        &self,
        graph: &mut TemporalGraph,
        mut accepted: Vec<(String, ExtractedBody)>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut declared: Vec<String> = accepted.iter().map(|(key, _)| key.clone()).collect();
        declared.sort();
        let resolver = TargetResolver { declared: &declared };

        for (caller, body) in &mut accepted {
            cancel.check()?;

            let mut call_sites = Vec::with_capacity(body.call_sites.len());
            for site in std::mem::take(&mut body.call_sites) {
                cancel.check()?;
                call_sites.push(self.resolve_call_site(graph, &resolver, caller, site));
            }
            if let Some(node) = graph.nodes.get_mut(caller.as_str()) {
                node.call_sites = call_sites;
            }
        }

        for (caller, body) in accepted {
            cancel.check()?;

            let mut signals = body.signals;
            for signal in &mut signals {
                signal.handler = self.resolve_handler(graph, &resolver, &caller, signal.handler.take(), NodeRole::SignalHandler);
            }
            let mut queries = body.queries;
            for query in &mut queries {
                query.handler = self.resolve_handler(graph, &resolver, &caller, query.handler.take(), NodeRole::QueryHandler);
            }
            let mut updates = body.updates;
            for update in &mut updates {
                update.handler = self.resolve_handler(graph, &resolver, &caller, update.handler.take(), NodeRole::UpdateHandler);
            }

            let Some(node) = graph.nodes.get_mut(&caller) else {
                continue;
            };
            node.internal_calls = body.internal_calls;
            node.signals = signals;
            node.queries = queries;
            node.updates = updates;
            node.timers = body.timers;
            node.search_attributes = body.search_attributes;
            node.versions = body.versions;
            node.continue_as_new = body.continue_as_new;
        }

        Ok(())
    }

    fn resolve_call_site(
        &self,
        graph: &mut TemporalGraph,
        resolver: &TargetResolver<'_>,
        caller: &str,
        mut site: CallSite,
    ) -> CallSite {
        if site.target_name == ANONYMOUS_TARGET {
            site.resolution = Resolution::Unresolved;
            return site;
        }

        let (resolution, target) = match resolver.resolve(graph, &site.target_name) {
            Lookup::Found(resolution, target) => (resolution, target),
            Lookup::Ambiguous(candidates) => {
                debug!(
                    "{} -> {} is ambiguous ({} candidates), leaving unresolved",
                    caller,
                    site.target_name,
                    candidates
                );
                site.resolution = Resolution::Unresolved;
                return site;
            }
            Lookup::Missing => {
                let role = site.target_role.stub_role();
                debug!("Synthesizing {} stub {} for {}", role, site.target_name, caller);
                graph
                    .nodes
                    .insert(site.target_name.clone(), TemporalNode::stub(site.target_name.clone(), role, caller));
                site.resolution = Resolution::Stub;
                return site;
            }
        };

        if let Some(node) = graph.nodes.get_mut(&target) {
            node.add_parent(caller);
        }
        site.target_name = target;
        site.resolution = resolution;
        site
    }

    /// Named handlers resolve like call targets; unknown ones become
    /// handler nodes owned by the registering workflow
    fn resolve_handler(
        &self,
        graph: &mut TemporalGraph,
        resolver: &TargetResolver<'_>,
        caller: &str,
        handler: Option<String>,
        role: NodeRole,
    ) -> Option<String> {
        let handler = handler?;
        match resolver.resolve(graph, &handler) {
            Lookup::Found(_, target) => {
                if let Some(node) = graph.nodes.get_mut(&target) {
                    node.add_parent(caller);
                }
                Some(target)
            }
            Lookup::Ambiguous(_) => Some(handler),
            Lookup::Missing => {
                debug!("Synthesizing {} node {} for {}", role, handler, caller);
                graph
                    .nodes
                    .insert(handler.clone(), TemporalNode::stub(handler.clone(), role, caller));
                Some(handler)
            }
        }
    }
}

impl Default for TwoPassGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder for TwoPassGraphBuilder {
    fn build(&self, declarations: Vec<DeclarationMatch>, cancel: &CancellationToken) -> Result<TemporalGraph> {
        let mut graph = TemporalGraph::new();

        let accepted = self.create_nodes(&mut graph, declarations, cancel)?;
        info!("Created {} nodes", graph.nodes.len());

        self.attach_edges(&mut graph, accepted, cancel)?;
        let stubs = graph.nodes.values().filter(|node| node.is_stub).count();
        info!("Resolved call sites ({} synthesized nodes)", stubs);

        graph.stats = compute_stats(&graph, cancel)?;
        Ok(graph)
    }
}

enum Lookup {
    Found(Resolution, String),
    Ambiguous(usize),
    Missing,
}

/// Exact key match first, then a unique `.Name` suffix among declared nodes.
/// While call sites resolve, the graph holds only declared nodes and
/// call-site stubs.
struct TargetResolver<'a> {
    /// Sorted keys of declared (non-synthesized) nodes
    declared: &'a [String],
}

impl TargetResolver<'_> {
    fn resolve(&self, graph: &TemporalGraph, target: &str) -> Lookup {
        if graph.nodes.contains_key(target) {
            return Lookup::Found(Resolution::Exact, target.to_string());
        }

        let Some((_, method)) = target.rsplit_once('.') else {
            return Lookup::Missing;
        };
        if method.is_empty() {
            return Lookup::Missing;
        }

        let suffix = format!(".{}", method);
        let candidates: HashSet<&String> = self
            .declared
            .iter()
            .filter(|key| key.ends_with(&suffix) || key.as_str() == method)
            .collect();

        match candidates.len() {
            0 => Lookup::Missing,
            1 => match candidates.into_iter().next() {
                Some(key) => Lookup::Found(Resolution::Suffix, key.clone()),
                None => Lookup::Missing,
            },
            count => Lookup::Ambiguous(count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::{CallRole, ParameterInfo, QueryDef, SignalDef};
    use std::path::PathBuf;

    fn declaration(name: &str, receiver: Option<&str>, role: NodeRole) -> DeclarationMatch {
        DeclarationMatch {
            name: name.to_string(),
            receiver_type: receiver.map(|r| r.to_string()),
            package: "orders".to_string(),
            file_path: PathBuf::from("orders/workflow.go"),
            line: 3,
            role,
            description: None,
            parameters: vec![ParameterInfo {
                name: "ctx".to_string(),
                type_name: "workflow.Context".to_string(),
            }],
            return_types: vec!["error".to_string()],
            body: ExtractedBody::default(),
        }
    }

    fn site(target: &str, role: CallRole) -> CallSite {
        CallSite {
            target_name: target.to_string(),
            target_role: role,
            line: 7,
            options: None,
            argument_count: 0,
            argument_types: Vec::new(),
            result_type: None,
            resolution: Resolution::Pending,
        }
    }

    fn build(declarations: Vec<DeclarationMatch>) -> TemporalGraph {
        TwoPassGraphBuilder::new()
            .build(declarations, &CancellationToken::new())
            .unwrap()
    }

    #[test]
    fn test_exact_resolution_adds_parent() {
        let mut workflow = declaration("OrderWorkflow", None, NodeRole::Workflow);
        workflow.body.call_sites.push(site("Charge", CallRole::Activity));
        workflow.body.call_sites.push(site("Charge", CallRole::Activity));

        let graph = build(vec![workflow, declaration("Charge", None, NodeRole::Activity)]);

        let charge = graph.get("Charge").unwrap();
        assert_eq!(charge.parents, vec!["OrderWorkflow"]);
        assert!(!charge.is_stub);
        let sites = &graph.get("OrderWorkflow").unwrap().call_sites;
        assert!(sites.iter().all(|s| s.resolution == Resolution::Exact));
    }

    #[test]
    fn test_suffix_resolution() {
        let mut workflow = declaration("OrderWorkflow", None, NodeRole::Workflow);
        workflow.body.call_sites.push(site("acts.Refund", CallRole::Activity));
        workflow.body.call_sites.push(site("activities.Charge", CallRole::Activity));

        let graph = build(vec![
            workflow,
            declaration("Refund", Some("Payments"), NodeRole::Activity),
            declaration("Charge", None, NodeRole::Activity),
        ]);

        let sites = &graph.get("OrderWorkflow").unwrap().call_sites;
        assert_eq!(sites[0].target_name, "Payments.Refund");
        assert_eq!(sites[0].resolution, Resolution::Suffix);
        assert_eq!(sites[1].target_name, "Charge");
        assert_eq!(graph.get("Payments.Refund").unwrap().parents, vec!["OrderWorkflow"]);
        assert_eq!(graph.stats.total_stubs, 0);
    }

    #[test]
    fn test_ambiguous_suffix_is_left_alone() {
        let mut workflow = declaration("OrderWorkflow", None, NodeRole::Workflow);
        workflow.body.call_sites.push(site("acts.Refund", CallRole::Activity));

        let graph = build(vec![
            workflow,
            declaration("Refund", Some("Payments"), NodeRole::Activity),
            declaration("Refund", Some("Shipping"), NodeRole::Activity),
        ]);

        let sites = &graph.get("OrderWorkflow").unwrap().call_sites;
        assert_eq!(sites[0].target_name, "acts.Refund");
        assert_eq!(sites[0].resolution, Resolution::Unresolved);
        assert_eq!(graph.len(), 3);
        assert!(graph.get("Payments.Refund").unwrap().parents.is_empty());
    }

    #[test]
    fn test_stub_synthesis() {
        let mut workflow = declaration("OrderWorkflow", None, NodeRole::Workflow);
        workflow.body.call_sites.push(site("UndeclaredFunc", CallRole::Activity));
        workflow.body.call_sites.push(site("ChildFlow", CallRole::ChildWorkflow));

        let graph = build(vec![workflow]);

        let stub = graph.get("UndeclaredFunc").unwrap();
        assert!(stub.is_stub);
        assert_eq!(stub.role, NodeRole::Activity);
        assert_eq!(stub.parents, vec!["OrderWorkflow"]);
        assert_eq!(graph.get("ChildFlow").unwrap().role, NodeRole::Workflow);
        assert_eq!(graph.stats.total_stubs, 2);
        assert_eq!(graph.stats.max_depth, 2);
    }

    #[test]
    fn test_stubs_are_not_suffix_candidates() {
        let mut first = declaration("First", None, NodeRole::Workflow);
        first.body.call_sites.push(site("Lookup", CallRole::Activity));
        let mut second = declaration("Second", None, NodeRole::Workflow);
        second.body.call_sites.push(site("acts.Lookup", CallRole::Activity));

        let graph = build(vec![first, second]);

        assert!(graph.get("Lookup").unwrap().is_stub);
        assert!(graph.get("acts.Lookup").unwrap().is_stub);
        assert_eq!(graph.get("Lookup").unwrap().parents, vec!["First"]);
    }

    #[test]
    fn test_duplicate_names_keep_the_first() {
        let mut first = declaration("OrderWorkflow", None, NodeRole::Workflow);
        first.line = 1;
        let mut second = declaration("OrderWorkflow", None, NodeRole::Workflow);
        second.line = 99;

        let graph = build(vec![first, second]);
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.get("OrderWorkflow").unwrap().line_number, 1);
    }

    #[test]
    fn test_handler_synthesis_and_double_counting() {
        let mut workflow = declaration("OrderWorkflow", None, NodeRole::Workflow);
        workflow.body.signals.push(SignalDef {
            name: "cancel".to_string(),
            handler: Some("onCancel".to_string()),
            line: 5,
            channel: false,
        });
        workflow.body.signals.push(SignalDef {
            name: "approve".to_string(),
            handler: None,
            line: 6,
            channel: true,
        });

        let graph = build(vec![workflow]);

        let handler = graph.get("onCancel").unwrap();
        assert_eq!(handler.role, NodeRole::SignalHandler);
        assert_eq!(handler.parents, vec!["OrderWorkflow"]);
        assert_eq!(graph.stats.total_signals, 3);
    }

    #[test]
    fn test_call_target_wins_over_handler_of_same_name() {
        let handler_owner = || {
            let mut workflow = declaration("AWorkflow", None, NodeRole::Workflow);
            workflow.body.queries.push(QueryDef {
                name: "q".to_string(),
                handler: Some("Lookup".to_string()),
                line: 4,
            });
            workflow
        };
        let caller = || {
            let mut workflow = declaration("BWorkflow", None, NodeRole::Workflow);
            workflow.body.call_sites.push(site("Lookup", CallRole::Activity));
            workflow
        };

        for declarations in [vec![handler_owner(), caller()], vec![caller(), handler_owner()]] {
            let graph = build(declarations);

            let lookup = graph.get("Lookup").unwrap();
            assert_eq!(lookup.role, NodeRole::Activity);
            assert!(lookup.is_stub);
            assert_eq!(lookup.parents, vec!["BWorkflow", "AWorkflow"]);

            let site = &graph.get("BWorkflow").unwrap().call_sites[0];
            assert_eq!(site.resolution, Resolution::Stub);
            assert_eq!(graph.get("AWorkflow").unwrap().queries[0].handler.as_deref(), Some("Lookup"));
            assert_eq!(graph.stats.total_activities, 1);
            assert_eq!(graph.stats.total_stubs, 1);
        }
    }

    #[test]
    fn test_cancelled_build() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = TwoPassGraphBuilder::new().build(
            vec![declaration("OrderWorkflow", None, NodeRole::Workflow)],
            &cancel,
        );
        assert!(matches!(result, Err(crate::error::AnalyzerError::Cancelled)));
    }
}
