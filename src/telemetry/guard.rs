use serde_json::{json, Value};
use std::panic::{catch_unwind, AssertUnwindSafe};

use super::{Operation, TelemetryError};
use crate::backend::BackendError;
use crate::diagnostics::DiagnosticSink;

/// Runs `op` and swallows whatever goes wrong.
///
/// A returned error or a panic is reported once to `sink` with the
/// operation's fixed message; `dump` is only evaluated on failure and should
/// describe the caller's original arguments. Returns whether `op` succeeded.
pub fn guarded<F, D>(sink: &dyn DiagnosticSink, operation: Operation, op: F, dump: D) -> bool
where
    F: FnOnce() -> Result<(), BackendError>,
    D: FnOnce() -> Value,
{
    let cause = match catch_unwind(AssertUnwindSafe(op)) {
        Ok(Ok(())) => return true,
        Ok(Err(err)) => err,
        Err(payload) => BackendError::Panicked(panic_message(payload.as_ref())),
    };

    let failure = TelemetryError::contained(operation, cause);
    let arguments = catch_unwind(AssertUnwindSafe(dump)).unwrap_or(Value::Null);
    sink.log_error(
        operation.failure_message(),
        &json!({
            "operation": operation.name(),
            "cause": failure.to_string(),
            "arguments": arguments,
        }),
    );
    false
}

/// Serializes an argument for a diagnostic dump, falling back to `null`.
pub fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
