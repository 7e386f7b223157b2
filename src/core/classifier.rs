//! Priority-ordered role classification of function declarations.
//!
//! Rules run top to bottom and the first one that answers wins. Handler
//! roles are never assigned here: a handler function has no shape of its
//! own and is only recognised where a workflow registers it.

use tree_sitter::Node;

use crate::error::Result;
use super::extractor::workflow_call_action;
use super::graph::NodeRole;
use super::registry::{RegisteredRole, Registry};
use super::syntax::{named_children, node_text, visit_calls};
use super::{CancellationToken, ParsedFile};

/// What a rule gets to look at for one declaration
pub struct DeclarationContext<'a, 't> {
    /// Bare function or method name
    pub name: &'a str,
    pub receiver_type: Option<&'a str>,
    pub function: Node<'t>,
    pub file: &'a ParsedFile,
    pub registry: &'a Registry,
    pub cancel: &'a CancellationToken,
}

impl DeclarationContext<'_, '_> {
    pub fn is_exported(&self) -> bool {
        is_exported(self.name)
    }

    /// Receiver type registered as a whole, for exported methods only
    fn inherited_role(&self) -> Option<RegisteredRole> {
        if !self.is_exported() {
            return None;
        }
        self.receiver_type.and_then(|receiver| self.registry.type_role(receiver))
    }

    fn qualified_name(&self) -> String {
        match self.receiver_type {
            Some(receiver) => format!("{}.{}", receiver, self.name),
            None => self.name.to_string(),
        }
    }
}

pub fn is_exported(name: &str) -> bool {
    name.chars().next().map(|c| c.is_uppercase()).unwrap_or(false)
}

pub trait ClassificationRule {
    fn name(&self) -> &'static str;

    /// `Some(role)` when the rule decides, `None` to defer to the next rule
    fn classify(&self, declaration: &DeclarationContext<'_, '_>) -> Result<Option<NodeRole>>;
}

/// Registered through `RegisterWorkflow`
pub struct RegisteredWorkflowRule;

impl ClassificationRule for RegisteredWorkflowRule {
    fn name(&self) -> &'static str {
        "registered-workflow"
    }

    fn classify(&self, declaration: &DeclarationContext<'_, '_>) -> Result<Option<NodeRole>> {
        let registry = declaration.registry;
        let registered = registry.is_registered_workflow(declaration.name)
            || registry.is_registered_workflow(&declaration.qualified_name())
            || declaration.inherited_role() == Some(RegisteredRole::Workflow);
        Ok(registered.then_some(NodeRole::Workflow))
    }
}

/// Registered through `RegisterActivity`, directly or via its receiver type
pub struct RegisteredActivityRule;

impl ClassificationRule for RegisteredActivityRule {
    fn name(&self) -> &'static str {
        "registered-activity"
    }

    fn classify(&self, declaration: &DeclarationContext<'_, '_>) -> Result<Option<NodeRole>> {
        let registry = declaration.registry;
        let receiver_registered = declaration.is_exported()
            && declaration
                .receiver_type
                .map(|receiver| registry.is_registered_activity(receiver))
                .unwrap_or(false);
        let registered = registry.is_registered_activity(declaration.name)
            || registry.is_registered_activity(&declaration.qualified_name())
            || receiver_registered
            || declaration.inherited_role() == Some(RegisteredRole::Activity);
        Ok(registered.then_some(NodeRole::Activity))
    }
}

/// `func X(ctx workflow.Context, ...)` whose body uses the workflow SDK
pub struct WorkflowSignatureRule;

impl WorkflowSignatureRule {
    fn takes_workflow_context(declaration: &DeclarationContext<'_, '_>) -> bool {
        let Some(parameters) = declaration.function.child_by_field_name("parameters") else {
            return false;
        };
        let Some(first) = named_children(parameters).into_iter().next() else {
            return false;
        };
        let Some(type_node) = first.child_by_field_name("type") else {
            return false;
        };

        let source = declaration.file.source.as_str();
        let imports = &declaration.file.imports;
        let type_text = node_text(type_node, source);
        match type_text.split_once('.') {
            Some((package, name)) => package == imports.workflow && name == "Context",
            None => imports.workflow_dot_import && type_text == "Context",
        }
    }

    fn body_uses_sdk(declaration: &DeclarationContext<'_, '_>) -> Result<bool> {
        let Some(body) = declaration.function.child_by_field_name("body") else {
            return Ok(false);
        };
        let source = declaration.file.source.as_str();
        let imports = &declaration.file.imports;

        let mut found = false;
        visit_calls(body, declaration.cancel, |call| {
            if !found && workflow_call_action(call, source, imports).is_some() {
                found = true;
            }
            Ok(())
        })?;
        Ok(found)
    }
}

impl ClassificationRule for WorkflowSignatureRule {
    fn name(&self) -> &'static str {
        "workflow-signature"
    }

    fn classify(&self, declaration: &DeclarationContext<'_, '_>) -> Result<Option<NodeRole>> {
        if !Self::takes_workflow_context(declaration) {
            return Ok(None);
        }
        Ok(Self::body_uses_sdk(declaration)?.then_some(NodeRole::Workflow))
    }
}

/// Ordered rule list; the first rule that answers decides
pub struct RoleClassifier {
    rules: Vec<Box<dyn ClassificationRule>>,
}

impl RoleClassifier {
    pub fn new() -> Self {
        Self::with_rules(vec![
            Box::new(RegisteredWorkflowRule),
            Box::new(RegisteredActivityRule),
            Box::new(WorkflowSignatureRule),
        ])
    }

    pub fn with_rules(rules: Vec<Box<dyn ClassificationRule>>) -> Self {
        Self { rules }
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    /// `None` means unclassified: the declaration stays out of the graph
    pub fn classify(&self, declaration: &DeclarationContext<'_, '_>) -> Result<Option<NodeRole>> {
        for rule in &self.rules {
            if let Some(role) = rule.classify(declaration)? {
                return Ok(Some(role));
            }
        }
        Ok(None)
    }
}

impl Default for RoleClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::Registration;
    use crate::core::syntax::receiver_type;
    use crate::core::GoSourceParser;
    use std::path::{Path, PathBuf};

    fn classify_all(source: &str, registry: &Registry) -> Vec<(String, Option<NodeRole>)> {
        let mut parser = GoSourceParser::new().unwrap();
        let file = parser
            .parse_source(Path::new("wf.go"), source.to_string())
            .unwrap();
        let classifier = RoleClassifier::new();
        let cancel = CancellationToken::new();

        named_children(file.tree.root_node())
            .into_iter()
            .filter(|n| matches!(n.kind(), "function_declaration" | "method_declaration"))
            .map(|function| {
                let name = node_text(function.child_by_field_name("name").unwrap(), &file.source).to_string();
                let receiver = receiver_type(function, &file.source);
                let context = DeclarationContext {
                    name: &name,
                    receiver_type: receiver.as_deref(),
                    function,
                    file: &file,
                    registry,
                    cancel: &cancel,
                };
                let role = classifier.classify(&context).unwrap();
                (name, role)
            })
            .collect()
    }

    fn registration(name: &str, role: RegisteredRole, owning_type: Option<&str>) -> Registration {
        Registration {
            name: name.to_string(),
            role,
            owning_type: owning_type.map(|t| t.to_string()),
            file_path: PathBuf::from("main.go"),
            line: 1,
        }
    }

    #[test]
    fn test_rule_order() {
        let names = RoleClassifier::new().rule_names();
        assert_eq!(names, vec!["registered-workflow", "registered-activity", "workflow-signature"]);
    }

    #[test]
    fn test_workflow_signature_requires_sdk_call() {
        let roles = classify_all(
            r#"package orders

func Sleeper(ctx workflow.Context) error {
    return workflow.Sleep(ctx, time.Minute)
}

func Idle(ctx workflow.Context) error {
    return nil
}

func TimeSleeper(ctx workflow.Context) {
    time.Sleep(time.Minute)
}

func NotAWorkflow(ctx context.Context) error {
    return workflow.Sleep(ctx, time.Minute)
}
"#,
            &Registry::new(),
        );

        assert_eq!(roles[0], ("Sleeper".to_string(), Some(NodeRole::Workflow)));
        assert_eq!(roles[1], ("Idle".to_string(), None));
        assert_eq!(roles[2], ("TimeSleeper".to_string(), None));
        assert_eq!(roles[3], ("NotAWorkflow".to_string(), None));
    }

    #[test]
    fn test_registration_wins_without_sdk_calls() {
        let mut registry = Registry::new();
        registry.record(registration("Plain", RegisteredRole::Workflow, None));
        registry.record(registration("Charge", RegisteredRole::Activity, None));
        registry.record(registration("Payments", RegisteredRole::Activity, Some("Payments")));

        let roles = classify_all(
            r#"package orders

func Plain(input string) error { return nil }

func Charge(ctx context.Context) error { return nil }

func (p *Payments) Refund(ctx context.Context) error { return nil }

func (p *Payments) helper() {}

func Unregistered() {}
"#,
            &registry,
        );

        assert_eq!(roles[0].1, Some(NodeRole::Workflow));
        assert_eq!(roles[1].1, Some(NodeRole::Activity));
        assert_eq!(roles[2].1, Some(NodeRole::Activity));
        assert_eq!(roles[3].1, None);
        assert_eq!(roles[4].1, None);
    }

    #[test]
    fn test_workflow_registration_outranks_activity() {
        let mut registry = Registry::new();
        registry.record(registration("Both", RegisteredRole::Activity, None));
        registry.record(registration("Both", RegisteredRole::Workflow, None));

        let roles = classify_all("package p\n\nfunc Both() {}\n", &registry);
        assert_eq!(roles[0].1, Some(NodeRole::Workflow));
    }

    #[test]
    fn test_aliased_workflow_package() {
        let roles = classify_all(
            r#"package orders

import wf "go.temporal.io/sdk/workflow"

func Aliased(ctx wf.Context) error {
    return wf.Sleep(ctx, time.Minute)
}
"#,
            &Registry::new(),
        );
        assert_eq!(roles[0].1, Some(NodeRole::Workflow));
    }
}
