use tree_sitter::Node;

use crate::core::graph::{CallOptions, RetryPolicyInfo};
use crate::core::syntax::{composite_literal, keyed_elements, node_text, string_literal_value};

/// Read the known fields of an options literal. Anything that is not a
/// literal struct is recorded as opaque.
pub fn parse_call_options(options: Option<Node<'_>>, source: &str) -> CallOptions {
    let Some(composite) = options.and_then(composite_literal) else {
        return CallOptions {
            opaque: true,
            ..CallOptions::default()
        };
    };

    let mut parsed = CallOptions::default();
    for (key, value) in keyed_elements(composite) {
        let text = node_text(value, source).to_string();
        match node_text(key, source) {
            "StartToCloseTimeout" => parsed.start_to_close_timeout = Some(text),
            "ScheduleToCloseTimeout" => parsed.schedule_to_close_timeout = Some(text),
            "ScheduleToStartTimeout" => parsed.schedule_to_start_timeout = Some(text),
            "HeartbeatTimeout" => parsed.heartbeat_timeout = Some(text),
            "WorkflowExecutionTimeout" => parsed.workflow_execution_timeout = Some(text),
            "WorkflowRunTimeout" => parsed.workflow_run_timeout = Some(text),
            "TaskQueue" => parsed.task_queue = Some(string_literal_value(value, source).unwrap_or(text)),
            "WorkflowID" => parsed.workflow_id = Some(string_literal_value(value, source).unwrap_or(text)),
            "RetryPolicy" => parsed.retry_policy = Some(parse_retry_policy(value, source)),
            _ => {}
        }
    }
    parsed
}

fn parse_retry_policy(value: Node<'_>, source: &str) -> RetryPolicyInfo {
    let mut policy = RetryPolicyInfo::default();
    let Some(composite) = composite_literal(value) else {
        return policy;
    };

    for (key, value) in keyed_elements(composite) {
        let text = node_text(value, source);
        match node_text(key, source) {
            "InitialInterval" => policy.initial_interval = Some(text.to_string()),
            "MaximumInterval" => policy.maximum_interval = Some(text.to_string()),
            "BackoffCoefficient" => {
                policy.backoff_coefficient = numeric_literal(value, source).and_then(|n| n.parse::<f64>().ok())
            }
            "MaximumAttempts" => {
                policy.maximum_attempts = numeric_literal(value, source).and_then(|n| n.parse::<i64>().ok())
            }
            _ => {}
        }
    }
    policy
}

/// Text of an int or float literal; identifiers and expressions are not
/// evaluated
fn numeric_literal<'a>(value: Node<'_>, source: &'a str) -> Option<&'a str> {
    match value.kind() {
        "int_literal" | "float_literal" => Some(node_text(value, source).trim()),
        _ => None,
    }
}

/// `Validator:` present in a `SetUpdateHandlerWithOptions` options literal
pub fn has_update_validator(options: Option<Node<'_>>, source: &str) -> bool {
    options
        .and_then(composite_literal)
        .map(|composite| {
            keyed_elements(composite)
                .into_iter()
                .any(|(key, _)| node_text(key, source) == "Validator")
        })
        .unwrap_or(false)
}
