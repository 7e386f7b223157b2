use tree_sitter::Node;

use crate::core::syntax::{
    callee, composite_literal, enclosing_function, is_address_of, named_children,
    new_call_type, node_text, resolve_local_type, string_literal_value,
};

/// Best-effort type tag for a payload argument
pub fn argument_type(argument: Node<'_>, source: &str) -> String {
    match argument.kind() {
        "interpreted_string_literal" | "raw_string_literal" => "string".to_string(),
        "int_literal" => "int".to_string(),
        "float_literal" => "float".to_string(),
        "imaginary_literal" => "complex".to_string(),
        "rune_literal" => "rune".to_string(),
        "true" | "false" => "bool".to_string(),
        "nil" => "nil".to_string(),
        "identifier" => "var".to_string(),
        "selector_expression" => "selector".to_string(),
        "func_literal" => "func".to_string(),
        "composite_literal" => composite_literal(argument)
            .and_then(|composite| composite.child_by_field_name("type"))
            .map(|type_node| node_text(type_node, source).to_string())
            .unwrap_or_else(|| "composite".to_string()),
        "unary_expression" if is_address_of(argument) => match composite_literal(argument)
            .and_then(|composite| composite.child_by_field_name("type"))
        {
            Some(type_node) => format!("*{}", node_text(type_node, source)),
            None => "pointer".to_string(),
        },
        "call_expression" => match callee(argument) {
            Some(found) => format!("call:{}", found.name(source)),
            None => "call".to_string(),
        },
        "parenthesized_expression" => named_children(argument)
            .into_iter()
            .next()
            .map(|inner| argument_type(inner, source))
            .unwrap_or_else(|| "expr".to_string()),
        _ => "expr".to_string(),
    }
}

/// Name an `Execute*` / continue-as-new target reference is known by
pub fn target_reference(target: Node<'_>, source: &str) -> String {
    match target.kind() {
        "func_literal" => "<anonymous>".to_string(),
        _ => string_literal_value(target, source)
            .unwrap_or_else(|| node_text(target, source).to_string()),
    }
}

/// Named handler passed to a `Set*Handler` call; inline closures have none
pub fn handler_reference(handler: Node<'_>, source: &str) -> Option<String> {
    match handler.kind() {
        "identifier" | "selector_expression" => Some(node_text(handler, source).to_string()),
        _ => None,
    }
}

/// Type behind the second argument of `.Get(ctx, &result)`
pub fn result_type(result: Node<'_>, source: &str) -> Option<String> {
    if let Some(type_text) = new_call_type(result, source) {
        return Some(type_text.to_string());
    }
    if !is_address_of(result) {
        return None;
    }
    if let Some(composite) = composite_literal(result) {
        return composite
            .child_by_field_name("type")
            .map(|type_node| node_text(type_node, source).to_string());
    }

    let operand = result.child_by_field_name("operand")?;
    if operand.kind() != "identifier" {
        return Some(format!("*{}", node_text(operand, source)));
    }
    let variable = node_text(operand, source);
    let resolved = enclosing_function(result)
        .and_then(|scope| resolve_local_type(scope, source, variable));
    match resolved {
        Some(type_text) if type_text.starts_with('*') => {
            Some(type_text.trim_start_matches('*').to_string())
        }
        Some(type_text) => Some(type_text),
        None => Some(format!("var:{}", variable)),
    }
}
