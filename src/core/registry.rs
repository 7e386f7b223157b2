//! Pre-pass that finds `RegisterWorkflow` / `RegisterActivity` calls.
//!
//! Classification consults the resulting [`Registry`] read-only; the scan
//! itself never fails because of one odd call shape.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;
use tree_sitter::Node;

use crate::error::Result;
use super::syntax::{
    base_type_name, call_arguments, callee, composite_literal, enclosing_function, is_address_of,
    line_of, new_call_type, node_text, resolve_local_type, visit_calls,
};
use super::{CancellationToken, ParsedFile};

/// Role a registration call assigns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisteredRole {
    Workflow,
    Activity,
}

/// One `Register*` call site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    /// Registered function text (`MyWorkflow`, `pkg.Fn`, `acts.Method`) or
    /// the struct type name for type registrations
    pub name: String,
    pub role: RegisteredRole,
    /// Set when a whole struct type was registered
    pub owning_type: Option<String>,
    pub file_path: PathBuf,
    pub line: usize,
}

/// Everything the registration pre-pass learned
#[derive(Debug, Clone, Default)]
pub struct Registry {
    workflows: HashMap<String, Registration>,
    activities: HashMap<String, Registration>,
    /// Struct type name -> role inherited by its exported methods
    registered_types: HashMap<String, RegisteredRole>,
    registrations: Vec<Registration>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, registration: Registration) {
        match &registration.owning_type {
            Some(type_name) => {
                self.registered_types
                    .entry(type_name.clone())
                    .or_insert(registration.role);
            }
            None => {
                let map = match registration.role {
                    RegisteredRole::Workflow => &mut self.workflows,
                    RegisteredRole::Activity => &mut self.activities,
                };
                // Index by the full text and by the trailing segment so
                // `pkg.Fn` and `acts.Method` match bare declaration names.
                let short = registration
                    .name
                    .rsplit('.')
                    .next()
                    .unwrap_or(&registration.name)
                    .to_string();
                map.entry(registration.name.clone())
                    .or_insert_with(|| registration.clone());
                map.entry(short).or_insert_with(|| registration.clone());
            }
        }
        self.registrations.push(registration);
    }

    pub fn is_registered_workflow(&self, name: &str) -> bool {
        self.workflows.contains_key(name)
    }

    pub fn is_registered_activity(&self, name: &str) -> bool {
        self.activities.contains_key(name)
    }

    /// Role a struct type's exported methods inherit, if it was registered
    pub fn type_role(&self, type_name: &str) -> Option<RegisteredRole> {
        self.registered_types
            .get(type_name)
            .or_else(|| self.registered_types.get(base_type_name(type_name)))
            .copied()
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

pub trait RegistryScanner {
    /// Scan every call expression of every file for registrations
    fn scan(&self, files: &[ParsedFile], cancel: &CancellationToken) -> Result<Registry>;
}

/// Recognises the Go SDK worker registration calls
pub struct WorkerRegistrationScanner;

impl WorkerRegistrationScanner {
    pub fn new() -> Self {
        Self
    }

    fn registration_role(method: &str) -> Option<RegisteredRole> {
        match method {
            "RegisterWorkflow" | "RegisterWorkflowWithOptions" => Some(RegisteredRole::Workflow),
            "RegisterActivity" | "RegisterActivityWithOptions" => Some(RegisteredRole::Activity),
            _ => None,
        }
    }

    fn scan_call(&self, file: &ParsedFile, call: Node<'_>) -> Option<Registration> {
        let source = file.source.as_str();
        let callee = callee(call)?;
        let operand = callee.operand?;
        if !matches!(operand.kind(), "identifier" | "selector_expression") {
            return None;
        }
        let role = Self::registration_role(callee.name(source))?;
        let argument = *call_arguments(call).first()?;
        let line = line_of(call);

        let registration = |name: String, owning_type: Option<String>| Registration {
            name,
            role,
            owning_type,
            file_path: file.path.clone(),
            line,
        };

        match argument.kind() {
            "identifier" => {
                let name = node_text(argument, source);
                // `acts := &Activities{}` followed by RegisterActivity(acts)
                let scope = enclosing_function(call).unwrap_or(file.tree.root_node());
                match resolve_local_type(scope, source, name)
                    .or_else(|| resolve_local_type(file.tree.root_node(), source, name))
                {
                    Some(type_text) => {
                        let type_name = base_type_name(&type_text).to_string();
                        Some(registration(type_name.clone(), Some(type_name)))
                    }
                    None => Some(registration(name.to_string(), None)),
                }
            }
            "selector_expression" => {
                Some(registration(node_text(argument, source).to_string(), None))
            }
            "unary_expression" if is_address_of(argument) => {
                if let Some(composite) = composite_literal(argument) {
                    let type_node = composite.child_by_field_name("type")?;
                    let type_name = base_type_name(node_text(type_node, source)).to_string();
                    return Some(registration(type_name.clone(), Some(type_name)));
                }
                let operand = argument.child_by_field_name("operand")?;
                if operand.kind() != "identifier" {
                    return None;
                }
                let variable = node_text(operand, source);
                let scope = enclosing_function(call).unwrap_or(file.tree.root_node());
                match resolve_local_type(scope, source, variable)
                    .or_else(|| resolve_local_type(file.tree.root_node(), source, variable))
                {
                    Some(type_text) => {
                        let type_name = base_type_name(&type_text).to_string();
                        Some(registration(type_name.clone(), Some(type_name)))
                    }
                    None => {
                        debug!(
                            "Cannot resolve type of &{} registered at {}:{}",
                            variable,
                            file.path.display(),
                            line
                        );
                        None
                    }
                }
            }
            "call_expression" => {
                let type_text = new_call_type(argument, source)?;
                let type_name = base_type_name(type_text).to_string();
                Some(registration(type_name.clone(), Some(type_name)))
            }
            "composite_literal" => {
                let type_node = argument.child_by_field_name("type")?;
                let type_name = base_type_name(node_text(type_node, source)).to_string();
                Some(registration(type_name.clone(), Some(type_name)))
            }
            _ => None,
        }
    }
}

impl Default for WorkerRegistrationScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryScanner for WorkerRegistrationScanner {
    fn scan(&self, files: &[ParsedFile], cancel: &CancellationToken) -> Result<Registry> {
        let mut registry = Registry::new();

        for file in files {
            cancel.check()?;
            visit_calls(file.tree.root_node(), cancel, |call| {
                if let Some(registration) = self.scan_call(file, call) {
                    debug!(
                        "Registered {:?} {} at {}:{}",
                        registration.role,
                        registration.name,
                        registration.file_path.display(),
                        registration.line
                    );
                    registry.record(registration);
                }
                Ok(())
            })?;
        }

        Ok(registry)
    }
}
