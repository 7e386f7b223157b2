// src/core/walker.rs
//! Source walk: turns parsed files into classified declarations.

use std::path::PathBuf;

use regex::Regex;
use tracing::{debug, warn};
use tree_sitter::Node;

use crate::error::Result;
use super::classifier::{DeclarationContext, RoleClassifier};
use super::extractor::{ExtractedBody, MetadataExtractor, SdkCallExtractor};
use super::graph::{NodeRole, ParameterInfo};
use super::registry::Registry;
use super::syntax::{doc_summary, line_of, named_children, node_text, receiver_type};
use super::{CancellationToken, ParsedFile};

/// A classified function or method, alive only until the graph is built
#[derive(Debug, Clone, PartialEq)]
pub struct DeclarationMatch {
    /// Bare declaration name
    pub name: String,
    pub receiver_type: Option<String>,
    pub package: String,
    pub file_path: PathBuf,
    pub line: usize,
    pub role: NodeRole,
    pub description: Option<String>,
    pub parameters: Vec<ParameterInfo>,
    pub return_types: Vec<String>,
    pub body: ExtractedBody,
}

impl DeclarationMatch {
    /// `Type.Method` for methods, the bare name otherwise
    pub fn qualified_name(&self) -> String {
        match &self.receiver_type {
            Some(receiver) => format!("{}.{}", receiver, self.name),
            None => self.name.clone(),
        }
    }
}

/// Regex filter that rejects everything when its pattern does not compile
#[derive(Debug, Clone)]
pub enum NameFilter {
    Any,
    Pattern(Regex),
    RejectAll,
}

impl NameFilter {
    pub fn from_pattern(label: &str, pattern: Option<&str>) -> Self {
        match pattern {
            None => NameFilter::Any,
            Some(pattern) if pattern.is_empty() => NameFilter::Any,
            Some(pattern) => match Regex::new(pattern) {
                Ok(regex) => NameFilter::Pattern(regex),
                Err(e) => {
                    warn!("Invalid {} filter {:?}, nothing will match: {}", label, pattern, e);
                    NameFilter::RejectAll
                }
            },
        }
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            NameFilter::Any => true,
            NameFilter::Pattern(regex) => regex.is_match(value),
            NameFilter::RejectAll => false,
        }
    }
}

/// Walks declarations, classifies them and extracts their bodies
pub struct SourceWalker {
    classifier: RoleClassifier,
    extractor: Box<dyn MetadataExtractor>,
    package_filter: NameFilter,
    name_filter: NameFilter,
}

impl SourceWalker {
    pub fn new(filter_package: Option<&str>, filter_name: Option<&str>) -> Self {
        Self {
            classifier: RoleClassifier::new(),
            extractor: Box::new(SdkCallExtractor::new()),
            package_filter: NameFilter::from_pattern("package", filter_package),
            name_filter: NameFilter::from_pattern("name", filter_name),
        }
    }

    pub fn with_components(
        classifier: RoleClassifier,
        extractor: Box<dyn MetadataExtractor>,
        package_filter: NameFilter,
        name_filter: NameFilter,
    ) -> Self {
        Self {
            classifier,
            extractor,
            package_filter,
            name_filter,
        }
    }

    pub fn walk(&self, files: &[ParsedFile], registry: &Registry, cancel: &CancellationToken) -> Result<Vec<DeclarationMatch>> {
        let mut declarations = Vec::new();
        debug!("Classification rules: {}", self.classifier.rule_names().join(", "));

        for file in files {
            cancel.check()?;
            for function in named_children(file.tree.root_node()) {
                if !matches!(function.kind(), "function_declaration" | "method_declaration") {
                    continue;
                }
                if let Some(declaration) = self.visit_declaration(function, file, registry, cancel)? {
                    declarations.push(declaration);
                }
            }
        }

        Ok(declarations)
    }

    fn visit_declaration(
        &self,
        function: Node<'_>,
        file: &ParsedFile,
        registry: &Registry,
        cancel: &CancellationToken,
    ) -> Result<Option<DeclarationMatch>> {
        let source = file.source.as_str();
        let Some(name_node) = function.child_by_field_name("name") else {
            return Ok(None);
        };
        let name = node_text(name_node, source).to_string();
        let receiver = if function.kind() == "method_declaration" {
            receiver_type(function, source)
        } else {
            None
        };

        let context = DeclarationContext {
            name: &name,
            receiver_type: receiver.as_deref(),
            function,
            file,
            registry,
            cancel,
        };
        let Some(role) = self.classifier.classify(&context)? else {
            return Ok(None);
        };

        let qualified = match &receiver {
            Some(receiver) => format!("{}.{}", receiver, name),
            None => name.clone(),
        };
        if !self.package_filter.matches(&file.package) {
            debug!("Filtered out {} (package {})", qualified, file.package);
            return Ok(None);
        }
        if !self.name_filter.matches(&name) && !self.name_filter.matches(&qualified) {
            debug!("Filtered out {} by name", qualified);
            return Ok(None);
        }

        debug!("Classified {} as {}", qualified, role);
        let body = self.extractor.extract(function, file, cancel)?;

        Ok(Some(DeclarationMatch {
            name,
            receiver_type: receiver,
            package: file.package.clone(),
            file_path: file.path.clone(),
            line: line_of(function),
            role,
            description: doc_summary(function, source),
            parameters: parameters(function, source),
            return_types: return_types(function, source),
            body,
        }))
    }
}

fn parameters(function: Node<'_>, source: &str) -> Vec<ParameterInfo> {
    function
        .child_by_field_name("parameters")
        .map(|list| parameter_list_entries(list, source))
        .unwrap_or_default()
}

fn return_types(function: Node<'_>, source: &str) -> Vec<String> {
    let Some(result) = function.child_by_field_name("result") else {
        return Vec::new();
    };
    if result.kind() != "parameter_list" {
        return vec![node_text(result, source).to_string()];
    }
    parameter_list_entries(result, source)
        .into_iter()
        .map(|parameter| parameter.type_name)
        .collect()
}

/// One entry per declared name; unnamed parameters get an empty name
fn parameter_list_entries(list: Node<'_>, source: &str) -> Vec<ParameterInfo> {
    let mut entries = Vec::new();
    for declaration in named_children(list) {
        let Some(type_node) = declaration.child_by_field_name("type") else {
            continue;
        };
        let mut type_name = node_text(type_node, source).to_string();
        if declaration.kind() == "variadic_parameter_declaration" {
            type_name = format!("...{}", type_name);
        }

        let mut cursor = declaration.walk();
        let names: Vec<String> = declaration
            .children_by_field_name("name", &mut cursor)
            .map(|name| node_text(name, source).to_string())
            .collect();
        if names.is_empty() {
            entries.push(ParameterInfo {
                name: String::new(),
                type_name,
            });
        } else {
            for name in names {
                entries.push(ParameterInfo {
                    name,
                    type_name: type_name.clone(),
                });
            }
        }
    }
    entries
}
