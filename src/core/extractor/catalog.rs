//! Fixed lookup tables for Temporal SDK calls and calls not worth tracing.

use crate::core::graph::CallRole;

/// What the extractor does with a recognised workflow-package call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdkAction {
    Execute(CallRole),
    SetSignalHandler,
    GetSignalChannel,
    SetQueryHandler,
    SetUpdateHandler { with_options: bool },
    Sleep,
    NewTimer,
    GetVersion,
    UpsertSearchAttributes,
    UpsertTypedSearchAttributes,
    ContinueAsNew,
    /// Coroutine and await primitives: they mark a workflow but carry no
    /// metadata of their own
    Coroutine,
}

/// Workflow-package calls, keyed by function name
pub static SDK_CALLS: &[(&str, SdkAction)] = &[
    ("ExecuteActivity", SdkAction::Execute(CallRole::Activity)),
    ("ExecuteLocalActivity", SdkAction::Execute(CallRole::LocalActivity)),
    ("ExecuteChildWorkflow", SdkAction::Execute(CallRole::ChildWorkflow)),
    ("SetSignalHandler", SdkAction::SetSignalHandler),
    ("GetSignalChannel", SdkAction::GetSignalChannel),
    ("SetQueryHandler", SdkAction::SetQueryHandler),
    ("SetUpdateHandler", SdkAction::SetUpdateHandler { with_options: false }),
    ("SetUpdateHandlerWithOptions", SdkAction::SetUpdateHandler { with_options: true }),
    ("Sleep", SdkAction::Sleep),
    ("NewTimer", SdkAction::NewTimer),
    ("GetVersion", SdkAction::GetVersion),
    ("UpsertSearchAttributes", SdkAction::UpsertSearchAttributes),
    ("UpsertTypedSearchAttributes", SdkAction::UpsertTypedSearchAttributes),
    ("NewContinueAsNewError", SdkAction::ContinueAsNew),
    ("Go", SdkAction::Coroutine),
    ("GoNamed", SdkAction::Coroutine),
    ("Await", SdkAction::Coroutine),
    ("AwaitWithTimeout", SdkAction::Coroutine),
    ("NewSelector", SdkAction::Coroutine),
    ("NewNamedSelector", SdkAction::Coroutine),
];

/// Option wrappers whose second argument configures the next `Execute*`
pub static OPTION_WRAPPERS: &[&str] = &[
    "WithActivityOptions",
    "WithLocalActivityOptions",
    "WithChildOptions",
];

/// Other workflow-package functions; unqualified under a dot-import they
/// are SDK calls, not internal ones
pub static WORKFLOW_EXPORTS: &[&str] = &[
    "GetInfo", "GetLogger", "GetMetricsHandler", "GetLastCompletionResult", "GetLastError",
    "GetTypedSearchAttributes", "GetMemo", "HasLastCompletionResult", "IsReplaying", "Now",
    "SideEffect", "MutableSideEffect", "NewChannel", "NewNamedChannel", "NewBufferedChannel",
    "NewNamedBufferedChannel", "NewFuture", "NewDisconnectedContext", "WithCancel",
    "WithValue", "WithWorkflowID", "WithTaskQueue", "WithRetryPolicy", "WithStartToCloseTimeout",
    "WithScheduleToCloseTimeout", "WithHeartbeatTimeout", "WithWaitForCancellation",
    "WithActivityOptions", "WithLocalActivityOptions", "WithChildOptions", "GetActivityOptions",
    "GetChildWorkflowOptions", "UpsertMemo", "RequestCancelExternalWorkflow",
    "SignalExternalWorkflow", "GetCurrentUpdateInfo", "AllHandlersFinished", "DataConverterWithoutDeadlockDetection",
];

/// Receivers whose calls are never internal calls
pub static EXCLUDED_RECEIVERS: &[&str] = &[
    "fmt", "log", "logger", "slog", "zap", "errors", "strings", "strconv", "bytes", "bufio",
    "io", "ioutil", "os", "filepath", "path", "time", "context", "json", "sort", "math",
    "sync", "atomic", "regexp", "reflect", "utf8", "unicode",
];

/// Method names too generic to be worth tracing
pub static BORING_METHODS: &[&str] = &[
    "Error", "Errorf", "Info", "Infof", "Debug", "Debugf", "Warn", "Warnf", "Print", "Printf",
    "Println", "Sprintf", "Sprint", "Fatal", "Fatalf", "Wrap", "Wrapf", "New", "Is", "As",
    "Get", "GetLogger", "String", "Len", "Close", "Lock", "Unlock", "Done", "Err", "Select",
    "Receive", "ReceiveAsync", "Send", "AddFuture", "AddReceive", "IsReady",
];

/// Go builtins
pub static BUILTINS: &[&str] = &[
    "append", "cap", "clear", "close", "complex", "copy", "delete", "imag", "len", "make",
    "max", "min", "new", "panic", "print", "println", "real", "recover",
];

pub fn sdk_action(name: &str) -> Option<SdkAction> {
    SDK_CALLS
        .iter()
        .find(|(call, _)| *call == name)
        .map(|(_, action)| *action)
}

pub fn is_option_wrapper(name: &str) -> bool {
    OPTION_WRAPPERS.contains(&name)
}

/// Any exported workflow-package function, catalogued or not
pub fn is_workflow_export(name: &str) -> bool {
    sdk_action(name).is_some() || is_option_wrapper(name) || WORKFLOW_EXPORTS.contains(&name)
}

pub fn is_excluded_receiver(receiver: &str) -> bool {
    EXCLUDED_RECEIVERS.contains(&receiver)
}

pub fn is_boring_method(name: &str) -> bool {
    BORING_METHODS.contains(&name)
}

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}
