// src/core/extractor/mod.rs
//! Call and metadata extraction for classified declarations.
//!
//! One pre-order pass over a function body visits each call expression
//! once. Calls found in the SDK catalog become call sites or metadata;
//! everything else that is not on a deny-list is kept as an internal call.

mod arguments;
mod catalog;
mod options;

use std::collections::HashSet;

use tracing::debug;
use tree_sitter::Node;

use crate::error::Result;
use super::graph::{
    CallRole, CallSite, ContinueAsNewMarker, InternalCall, QueryDef, Resolution,
    SearchAttributeDef, SignalDef, TimerDef, UpdateDef, VersionDef,
};
use super::syntax::{
    call_arguments, callee, keyed_elements, line_of, node_text, string_literal_value, visit_calls,
    Callee,
};
use super::{CancellationToken, ParsedFile, SdkImports};

pub use catalog::{sdk_action, SdkAction};

/// Placeholder for search attributes that are not a map literal
pub const DYNAMIC_SEARCH_ATTRIBUTE: &str = "<dynamic>";

/// Everything extracted from one function body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedBody {
    pub call_sites: Vec<CallSite>,
    pub internal_calls: Vec<InternalCall>,
    pub signals: Vec<SignalDef>,
    pub queries: Vec<QueryDef>,
    pub updates: Vec<UpdateDef>,
    pub timers: Vec<TimerDef>,
    pub search_attributes: Vec<SearchAttributeDef>,
    pub versions: Vec<VersionDef>,
    pub continue_as_new: Vec<ContinueAsNewMarker>,
}

pub trait MetadataExtractor {
    /// Walk `function`'s body once and collect its calls and metadata
    fn extract(&self, function: Node<'_>, file: &ParsedFile, cancel: &CancellationToken) -> Result<ExtractedBody>;
}

/// Catalog action for a call qualified by the workflow package alias
pub fn workflow_call_action(call: Node<'_>, source: &str, imports: &SdkImports) -> Option<SdkAction> {
    let found = callee(call)?;
    if !imports.is_workflow_qualifier(found.qualifier(source)) {
        return None;
    }
    sdk_action(found.name(source))
}

/// Extractor for the Temporal Go SDK call catalog
pub struct SdkCallExtractor;

impl SdkCallExtractor {
    pub fn new() -> Self {
        Self
    }

    fn execute_role(call: Node<'_>, source: &str, imports: &SdkImports) -> Option<CallRole> {
        match workflow_call_action(call, source, imports)? {
            SdkAction::Execute(role) => Some(role),
            _ => None,
        }
    }

    fn call_site(&self, call: Node<'_>, role: CallRole, source: &str, imports: &SdkImports) -> Option<CallSite> {
        let args = call_arguments(call);
        let Some(target) = args.get(1) else {
            debug!("Execute call without a target at line {}", line_of(call));
            return None;
        };

        let options = args.first().and_then(|context| {
            let wrapper = callee(*context)?;
            if context.kind() != "call_expression"
                || !imports.is_workflow_qualifier(wrapper.qualifier(source))
                || !catalog::is_option_wrapper(wrapper.name(source))
            {
                return None;
            }
            let wrapper_args = call_arguments(*context);
            Some(options::parse_call_options(wrapper_args.get(1).copied(), source))
        });

        let payload = args.get(2..).unwrap_or(&[]);
        Some(CallSite {
            target_name: arguments::target_reference(*target, source),
            target_role: role,
            line: line_of(call),
            options,
            argument_count: payload.len(),
            argument_types: payload
                .iter()
                .map(|argument| arguments::argument_type(*argument, source))
                .collect(),
            result_type: None,
            resolution: Resolution::Pending,
        })
    }

    /// Name argument of a handler/channel call: the string value, or the
    /// expression text for constants
    fn name_argument(args: &[Node<'_>], index: usize, source: &str) -> String {
        args.get(index)
            .map(|arg| string_literal_value(*arg, source).unwrap_or_else(|| node_text(*arg, source).to_string()))
            .unwrap_or_default()
    }

    fn version_value(arg: Option<&Node<'_>>, source: &str, imports: &SdkImports) -> Option<i64> {
        let arg = arg?;
        match arg.kind() {
            "int_literal" | "unary_expression" => node_text(*arg, source).replace(' ', "").parse().ok(),
            "selector_expression" => {
                let operand = arg.child_by_field_name("operand")?;
                let field = arg.child_by_field_name("field")?;
                if node_text(operand, source) == imports.workflow && node_text(field, source) == "DefaultVersion" {
                    Some(-1)
                } else {
                    None
                }
            }
            "identifier" if imports.workflow_dot_import && node_text(*arg, source) == "DefaultVersion" => Some(-1),
            _ => None,
        }
    }

    fn search_attribute_name(arg: Option<&Node<'_>>, source: &str) -> String {
        let Some(arg) = arg else {
            return DYNAMIC_SEARCH_ATTRIBUTE.to_string();
        };
        let is_map_literal = arg.kind() == "composite_literal"
            && arg
                .child_by_field_name("type")
                .map(|type_node| type_node.kind() == "map_type")
                .unwrap_or(false);
        if !is_map_literal {
            return DYNAMIC_SEARCH_ATTRIBUTE.to_string();
        }

        let keys: Vec<String> = keyed_elements(*arg)
            .into_iter()
            .map(|(key, _)| string_literal_value(key, source).unwrap_or_else(|| node_text(key, source).to_string()))
            .collect();
        if keys.is_empty() {
            DYNAMIC_SEARCH_ATTRIBUTE.to_string()
        } else {
            keys.join(",")
        }
    }

    fn apply(&self, action: SdkAction, call: Node<'_>, source: &str, imports: &SdkImports, body: &mut ExtractedBody) {
        let args = call_arguments(call);
        let line = line_of(call);

        match action {
            SdkAction::Execute(role) => {
                if let Some(site) = self.call_site(call, role, source, imports) {
                    body.call_sites.push(site);
                }
            }
            SdkAction::SetSignalHandler => body.signals.push(SignalDef {
                name: Self::name_argument(&args, 1, source),
                handler: args.get(2).and_then(|h| arguments::handler_reference(*h, source)),
                line,
                channel: false,
            }),
            SdkAction::GetSignalChannel => body.signals.push(SignalDef {
                name: Self::name_argument(&args, 1, source),
                handler: None,
                line,
                channel: true,
            }),
            SdkAction::SetQueryHandler => body.queries.push(QueryDef {
                name: Self::name_argument(&args, 1, source),
                handler: args.get(2).and_then(|h| arguments::handler_reference(*h, source)),
                line,
            }),
            SdkAction::SetUpdateHandler { with_options } => body.updates.push(UpdateDef {
                name: Self::name_argument(&args, 1, source),
                handler: args.get(2).and_then(|h| arguments::handler_reference(*h, source)),
                line,
                has_validator: with_options && options::has_update_validator(args.get(3).copied(), source),
            }),
            SdkAction::Sleep | SdkAction::NewTimer => body.timers.push(TimerDef {
                duration: args
                    .get(1)
                    .map(|duration| node_text(*duration, source).to_string())
                    .unwrap_or_default(),
                is_sleep: action == SdkAction::Sleep,
                line,
            }),
            SdkAction::GetVersion => body.versions.push(VersionDef {
                change_id: Self::name_argument(&args, 1, source),
                min_version: Self::version_value(args.get(2), source, imports),
                max_version: Self::version_value(args.get(3), source, imports),
                line,
            }),
            SdkAction::UpsertSearchAttributes => body.search_attributes.push(SearchAttributeDef {
                name: Self::search_attribute_name(args.get(1), source),
                line,
            }),
            SdkAction::UpsertTypedSearchAttributes => body.search_attributes.push(SearchAttributeDef {
                name: DYNAMIC_SEARCH_ATTRIBUTE.to_string(),
                line,
            }),
            SdkAction::ContinueAsNew => body.continue_as_new.push(ContinueAsNewMarker {
                target: args.get(1).map(|target| arguments::target_reference(*target, source)),
                line,
            }),
            SdkAction::Coroutine => {}
        }
    }

    /// Target name of a non-SDK call, or `None` when it is filtered out
    fn internal_target(found: &Callee<'_>, source: &str, imports: &SdkImports) -> Option<String> {
        let name = found.name(source);
        let Some(operand) = found.operand else {
            if catalog::is_builtin(name) {
                return None;
            }
            if imports.workflow_dot_import && catalog::is_workflow_export(name) {
                return None;
            }
            return Some(name.to_string());
        };

        if catalog::is_boring_method(name) {
            return None;
        }
        match operand.kind() {
            "identifier" => {
                let receiver = node_text(operand, source);
                if imports.is_sdk_receiver(receiver) || catalog::is_excluded_receiver(receiver) {
                    None
                } else {
                    Some(format!("{}.{}", receiver, name))
                }
            }
            "selector_expression" => Some(format!("{}.{}", node_text(operand, source), name)),
            _ => Some(name.to_string()),
        }
    }
}

impl Default for SdkCallExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataExtractor for SdkCallExtractor {
    fn extract(&self, function: Node<'_>, file: &ParsedFile, cancel: &CancellationToken) -> Result<ExtractedBody> {
        let mut body = ExtractedBody::default();
        let Some(block) = function.child_by_field_name("body") else {
            return Ok(body);
        };

        let source = file.source.as_str();
        let imports = &file.imports;
        let mut consumed: HashSet<usize> = HashSet::new();
        let mut seen_internal: HashSet<String> = HashSet::new();

        visit_calls(block, cancel, |call| {
            if consumed.contains(&call.id()) {
                return Ok(());
            }
            let Some(found) = callee(call) else {
                return Ok(());
            };

            // ExecuteX(..).Get(ctx, &result) is one logical call site
            if found.name(source) == "Get" {
                if let Some(inner) = found.operand.filter(|operand| operand.kind() == "call_expression") {
                    if let Some(role) = Self::execute_role(inner, source, imports) {
                        consumed.insert(inner.id());
                        if let Some(mut site) = self.call_site(inner, role, source, imports) {
                            site.result_type = call_arguments(call)
                                .get(1)
                                .and_then(|result| arguments::result_type(*result, source));
                            body.call_sites.push(site);
                        }
                        return Ok(());
                    }
                }
            }

            if let Some(action) = workflow_call_action(call, source, imports) {
                self.apply(action, call, source, imports, &mut body);
                return Ok(());
            }

            if let Some(target) = Self::internal_target(&found, source, imports) {
                if seen_internal.insert(target.clone()) {
                    body.internal_calls.push(InternalCall {
                        target,
                        line: line_of(call),
                    });
                }
            }
            Ok(())
        })?;

        Ok(body)
    }
}
