use crate::error::{GradeError, GradeResult};
use crate::ipc::error::reply;
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, _req: &Request) -> GradeResult<serde_json::Value> {
    Ok(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
    }))
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> GradeResult<serde_json::Value> {
    let path = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from)
        .ok_or_else(|| GradeError::validation("missing params.path"))?;

    state.open_workspace(&path).map_err(|e| {
        GradeError::Io(std::io::Error::other(format!("cannot open workspace: {e:#}")))
    })?;
    tracing::info!(workspace = %path.display(), "workspace selected");
    Ok(json!({ "workspacePath": path.to_string_lossy() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let outcome = match req.method.as_str() {
        "health" => handle_health(state, req),
        "workspace.select" => handle_workspace_select(state, req),
        _ => return None,
    };
    Some(reply(&req.id, &req.method, outcome))
}
