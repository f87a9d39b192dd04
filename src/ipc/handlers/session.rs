use crate::error::{GradeError, GradeResult};
use crate::ipc::error::reply;
use crate::ipc::helpers::{current_actor, get_str, require_db};
use crate::ipc::types::{AppState, Request};
use rusqlite::OptionalExtension;
use serde_json::json;

/// The host has already authenticated the person; this only binds the
/// account that subsequent requests act as.
fn handle_login(state: &mut AppState, req: &Request) -> GradeResult<serde_json::Value> {
    let username = get_str(&req.params, "username")?;
    let conn = require_db(state)?;
    let user_id: i64 = conn
        .query_row("SELECT id FROM users WHERE username = ?", [&username], |r| {
            r.get(0)
        })
        .optional()?
        .ok_or(GradeError::NotFound("user"))?;
    state.session_user = Some(user_id);
    let actor = current_actor(state, require_db(state)?)?;
    tracing::info!(user = %actor.username, "session opened");
    Ok(json!({ "actor": actor }))
}

fn handle_logout(state: &mut AppState, _req: &Request) -> GradeResult<serde_json::Value> {
    state.session_user = None;
    Ok(json!({ "ok": true }))
}

fn handle_whoami(state: &mut AppState, _req: &Request) -> GradeResult<serde_json::Value> {
    let conn = require_db(state)?;
    let actor = match state.session_user {
        Some(_) => current_actor(state, conn).ok(),
        None => None,
    };
    Ok(json!({ "actor": actor }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let outcome = match req.method.as_str() {
        "session.login" => handle_login(state, req),
        "session.logout" => handle_logout(state, req),
        "session.whoami" => handle_whoami(state, req),
        _ => return None,
    };
    Some(reply(&req.id, &req.method, outcome))
}
