//! Helpers over the tree-sitter Go syntax tree.
//!
//! Everything that inspects raw tree-sitter nodes lives here so the
//! scanner, classifier and extractor only speak in names and shapes.

use tree_sitter::Node;

use crate::error::Result;
use super::CancellationToken;

/// Visit every `call_expression` under `root` exactly once, depth-first and
/// pre-order. The token is polled at every node, not only at calls.
pub fn visit_calls<'t, F>(root: Node<'t>, cancel: &CancellationToken, mut visit: F) -> Result<()>
where
    F: FnMut(Node<'t>) -> Result<()>,
{
    let mut cursor = root.walk();
    let mut depth = 0usize;

    loop {
        cancel.check()?;
        let node = cursor.node();
        if node.kind() == "call_expression" {
            visit(node)?;
        }

        if cursor.goto_first_child() {
            depth += 1;
            continue;
        }

        loop {
            if depth == 0 {
                return Ok(());
            }
            if cursor.goto_next_sibling() {
                break;
            }
            cursor.goto_parent();
            depth -= 1;
        }
    }
}

/// All nodes under `root` (inclusive) in pre-order.
pub fn preorder(root: Node<'_>) -> Vec<Node<'_>> {
    let mut nodes = Vec::new();
    let mut cursor = root.walk();
    let mut depth = 0usize;

    loop {
        nodes.push(cursor.node());

        if cursor.goto_first_child() {
            depth += 1;
            continue;
        }

        loop {
            if depth == 0 {
                return nodes;
            }
            if cursor.goto_next_sibling() {
                break;
            }
            cursor.goto_parent();
            depth -= 1;
        }
    }
}

pub fn node_text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    &source[node.byte_range()]
}

/// 1-based line of the node's first byte.
pub fn line_of(node: Node<'_>) -> usize {
    node.start_position().row + 1
}

/// Named children, skipping comments.
pub fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

/// Positional arguments of a call expression.
pub fn call_arguments(call: Node<'_>) -> Vec<Node<'_>> {
    call.child_by_field_name("arguments")
        .map(named_children)
        .unwrap_or_default()
}

/// The callee of a call expression split into an optional operand and the
/// final name: `workflow.Sleep(..)` gives (`workflow`, `Sleep`),
/// `helper(..)` gives (`None`, `helper`).
#[derive(Debug, Clone, Copy)]
pub struct Callee<'t> {
    pub operand: Option<Node<'t>>,
    pub name: Node<'t>,
}

impl<'t> Callee<'t> {
    pub fn name<'s>(&self, source: &'s str) -> &'s str {
        node_text(self.name, source)
    }

    /// Operand text when the operand is a plain identifier.
    pub fn qualifier<'s>(&self, source: &'s str) -> Option<&'s str> {
        self.operand
            .filter(|operand| operand.kind() == "identifier")
            .map(|operand| node_text(operand, source))
    }
}

pub fn callee(call: Node<'_>) -> Option<Callee<'_>> {
    let function = call.child_by_field_name("function")?;
    match function.kind() {
        "identifier" => Some(Callee { operand: None, name: function }),
        "selector_expression" => Some(Callee {
            operand: function.child_by_field_name("operand"),
            name: function.child_by_field_name("field")?,
        }),
        "parenthesized_expression" => {
            // (pkg.Fn)(args) parses with the selector one level down
            let inner = named_children(function).into_iter().next()?;
            match inner.kind() {
                "identifier" => Some(Callee { operand: None, name: inner }),
                "selector_expression" => Some(Callee {
                    operand: inner.child_by_field_name("operand"),
                    name: inner.child_by_field_name("field")?,
                }),
                _ => None,
            }
        }
        _ => None,
    }
}

pub fn is_string_literal(node: Node<'_>) -> bool {
    matches!(node.kind(), "interpreted_string_literal" | "raw_string_literal")
}

/// Value of a Go string literal node, `None` for anything else.
pub fn string_literal_value(node: Node<'_>, source: &str) -> Option<String> {
    if !is_string_literal(node) {
        return None;
    }
    Some(unquote(node_text(node, source)))
}

/// Strip Go string quotes, undoing the common escapes of interpreted strings.
pub fn unquote(text: &str) -> String {
    if text.len() >= 2 && text.starts_with('`') && text.ends_with('`') {
        return text[1..text.len() - 1].to_string();
    }
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        let inner = &text[1..text.len() - 1];
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        }
        return out;
    }
    text.to_string()
}

/// `*pkg.Type[T]` -> `pkg.Type`
pub fn strip_type_decorations(type_text: &str) -> &str {
    let trimmed = type_text.trim().trim_start_matches('*').trim_start_matches('&');
    match trimmed.find('[') {
        Some(index) => &trimmed[..index],
        None => trimmed,
    }
}

/// `*pkg.Type[T]` -> `Type`
pub fn base_type_name(type_text: &str) -> &str {
    let stripped = strip_type_decorations(type_text);
    stripped.rsplit('.').next().unwrap_or(stripped)
}

/// Receiver type of a method declaration with pointer and generic
/// decorations removed.
pub fn receiver_type(method: Node<'_>, source: &str) -> Option<String> {
    let receiver = method.child_by_field_name("receiver")?;
    let declaration = named_children(receiver)
        .into_iter()
        .find(|child| child.kind() == "parameter_declaration")?;
    let type_node = declaration.child_by_field_name("type")?;
    let name = strip_type_decorations(node_text(type_node, source));
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Unwrap the `literal_element` wrapper newer grammars put around keys and
/// values of composite literals.
pub fn unwrap_literal_element(node: Node<'_>) -> Node<'_> {
    if node.kind() == "literal_element" {
        if let Some(inner) = named_children(node).into_iter().next() {
            return inner;
        }
    }
    node
}

/// `(key, value)` pairs of a composite literal's keyed elements.
pub fn keyed_elements(composite: Node<'_>) -> Vec<(Node<'_>, Node<'_>)> {
    let Some(body) = composite.child_by_field_name("body") else {
        return Vec::new();
    };
    named_children(body)
        .into_iter()
        .filter(|element| element.kind() == "keyed_element")
        .filter_map(|element| {
            let parts = named_children(element);
            match (parts.first(), parts.get(1)) {
                (Some(key), Some(value)) => {
                    Some((unwrap_literal_element(*key), unwrap_literal_element(*value)))
                }
                _ => None,
            }
        })
        .collect()
}

/// Composite literal behind `T{..}` or `&T{..}`.
pub fn composite_literal(node: Node<'_>) -> Option<Node<'_>> {
    match node.kind() {
        "composite_literal" => Some(node),
        "unary_expression" if is_address_of(node) => node
            .child_by_field_name("operand")
            .filter(|operand| operand.kind() == "composite_literal"),
        "parenthesized_expression" => named_children(node)
            .into_iter()
            .next()
            .and_then(composite_literal),
        _ => None,
    }
}

pub fn is_address_of(node: Node<'_>) -> bool {
    node.kind() == "unary_expression"
        && node
            .child_by_field_name("operator")
            .map(|operator| operator.kind() == "&")
            .unwrap_or(false)
}

/// Type argument of `new(T)`.
pub fn new_call_type<'s>(node: Node<'_>, source: &'s str) -> Option<&'s str> {
    if node.kind() != "call_expression" {
        return None;
    }
    let callee = callee(node)?;
    if callee.operand.is_some() || callee.name(source) != "new" {
        return None;
    }
    call_arguments(node)
        .first()
        .map(|argument| node_text(*argument, source))
}

/// Static type of an initializer expression, when it spells one out.
pub fn initializer_type(expression: Node<'_>, source: &str) -> Option<String> {
    if let Some(composite) = composite_literal(expression) {
        let type_node = composite.child_by_field_name("type")?;
        return Some(node_text(type_node, source).to_string());
    }
    if let Some(type_text) = new_call_type(expression, source) {
        return Some(type_text.to_string());
    }
    None
}

/// Best-effort type of a local binding named `ident` inside `scope`:
/// `var x T`, `var x = T{}`, `x := T{}`, `x := &T{}`, `x := new(T)`.
pub fn resolve_local_type(scope: Node<'_>, source: &str, ident: &str) -> Option<String> {
    for node in preorder(scope) {
        match node.kind() {
            "var_spec" => {
                let mut cursor = node.walk();
                let names: Vec<&str> = node
                    .children_by_field_name("name", &mut cursor)
                    .map(|name| node_text(name, source))
                    .collect();
                let Some(position) = names.iter().position(|name| *name == ident) else {
                    continue;
                };
                if let Some(type_node) = node.child_by_field_name("type") {
                    return Some(node_text(type_node, source).to_string());
                }
                if let Some(values) = node.child_by_field_name("value") {
                    if let Some(value) = named_children(values).get(position) {
                        if let Some(found) = initializer_type(*value, source) {
                            return Some(found);
                        }
                    }
                }
            }
            "short_var_declaration" => {
                let (Some(left), Some(right)) = (
                    node.child_by_field_name("left"),
                    node.child_by_field_name("right"),
                ) else {
                    continue;
                };
                let Some(position) = named_children(left)
                    .iter()
                    .position(|name| node_text(*name, source) == ident)
                else {
                    continue;
                };
                if let Some(value) = named_children(right).get(position) {
                    if let Some(found) = initializer_type(*value, source) {
                        return Some(found);
                    }
                }
            }
            _ => {}
        }
    }
    None
}

/// Innermost function, method or function literal enclosing `node`.
pub fn enclosing_function(node: Node<'_>) -> Option<Node<'_>> {
    let mut current = node.parent();
    while let Some(candidate) = current {
        if matches!(
            candidate.kind(),
            "function_declaration" | "method_declaration" | "func_literal"
        ) {
            return Some(candidate);
        }
        current = candidate.parent();
    }
    None
}

/// First sentence of the `//` comment block directly above a declaration.
pub fn doc_summary(declaration: Node<'_>, source: &str) -> Option<String> {
    let mut lines = Vec::new();
    let mut expected_row = declaration.start_position().row;
    let mut current = declaration.prev_sibling();

    while let Some(comment) = current {
        if comment.kind() != "comment" || comment.end_position().row + 1 != expected_row {
            break;
        }
        let text = node_text(comment, source);
        let cleaned = text
            .trim_start_matches("//")
            .trim_start_matches("/*")
            .trim_end_matches("*/")
            .trim();
        lines.push(cleaned.to_string());
        expected_row = comment.start_position().row;
        current = comment.prev_sibling();
    }

    if lines.is_empty() {
        return None;
    }
    lines.reverse();
    let joined = lines
        .into_iter()
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    let summary = match joined.find(". ") {
        Some(end) => joined[..=end].to_string(),
        None => joined,
    };
    if summary.is_empty() {
        None
    } else {
        Some(summary)
    }
}
