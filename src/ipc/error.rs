use crate::error::GradeError;
use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// Wraps a handler outcome into a response, logging failures.
pub fn reply(id: &str, method: &str, outcome: Result<serde_json::Value, GradeError>) -> serde_json::Value {
    match outcome {
        Ok(result) => ok(id, result),
        Err(e) => {
            tracing::warn!(method, code = e.code(), error = %e, "request failed");
            err(id, e.code(), e.to_string(), None)
        }
    }
}
