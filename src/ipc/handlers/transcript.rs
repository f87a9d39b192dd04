use crate::error::GradeResult;
use crate::ipc::error::reply;
use crate::ipc::helpers::{get_id, require_db};
use crate::ipc::types::{AppState, Request};
use crate::transcript;
use serde_json::{json, Value};

fn handle_average(state: &mut AppState, req: &Request) -> GradeResult<Value> {
    let conn = require_db(state)?;
    let student_id = get_id(&req.params, "studentId")?;
    let average = transcript::student_average(conn, student_id)?;
    Ok(json!({ "studentId": student_id, "average": average }))
}

fn handle_get(state: &mut AppState, req: &Request) -> GradeResult<Value> {
    let conn = require_db(state)?;
    let model = transcript::transcript_model(conn, get_id(&req.params, "studentId")?)?;
    Ok(serde_json::to_value(model).unwrap_or(Value::Null))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let outcome = match req.method.as_str() {
        "transcript.average" => handle_average(state, req),
        "transcript.get" => handle_get(state, req),
        _ => return None,
    };
    Some(reply(&req.id, &req.method, outcome))
}
