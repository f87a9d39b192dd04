//! Parameter decoding and session plumbing shared by the handlers.

use crate::access::{self, Actor};
use crate::error::{GradeError, GradeResult};
use crate::ipc::types::AppState;
use rusqlite::Connection;
use serde_json::Value;

pub fn require_db(state: &AppState) -> GradeResult<&Connection> {
    state.db.as_ref().ok_or(GradeError::NoWorkspace)
}

/// The logged-in account as it is stored right now. A session whose account
/// has since been removed counts as logged out.
pub fn current_actor(state: &AppState, conn: &Connection) -> GradeResult<Actor> {
    let Some(user_id) = state.session_user else {
        return Err(GradeError::Unauthenticated);
    };
    access::load_actor(conn, user_id)?.ok_or(GradeError::Unauthenticated)
}

/// Ids arrive as JSON integers or as numeric strings from form-backed hosts.
fn id_value(v: &Value, key: &str) -> GradeResult<Option<i64>> {
    match v {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| GradeError::validation(format!("{key} must be an integer id"))),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| GradeError::validation(format!("{key} must be an integer id"))),
        _ => Err(GradeError::validation(format!("{key} must be an integer id"))),
    }
}

pub fn opt_id(params: &Value, key: &str) -> GradeResult<Option<i64>> {
    match params.get(key) {
        Some(v) => id_value(v, key),
        None => Ok(None),
    }
}

pub fn get_id(params: &Value, key: &str) -> GradeResult<i64> {
    opt_id(params, key)?.ok_or_else(|| GradeError::validation(format!("missing {key}")))
}

/// Absent key: leave as is. `null`: clear. Otherwise an id.
pub fn patch_id(params: &Value, key: &str) -> GradeResult<Option<Option<i64>>> {
    match params.get(key) {
        None => Ok(None),
        Some(v) => Ok(Some(id_value(v, key)?)),
    }
}

pub fn opt_i64(params: &Value, key: &str) -> GradeResult<Option<i64>> {
    opt_id(params, key)
}

pub fn opt_u32(params: &Value, key: &str) -> GradeResult<Option<u32>> {
    match opt_id(params, key)? {
        None => Ok(None),
        Some(n) => u32::try_from(n)
            .map(Some)
            .map_err(|_| GradeError::validation(format!("{key} must be a non-negative integer"))),
    }
}

pub fn opt_str(params: &Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
}

pub fn get_str(params: &Value, key: &str) -> GradeResult<String> {
    opt_str(params, key)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| GradeError::validation(format!("missing {key}")))
}

pub fn opt_bool(params: &Value, key: &str) -> GradeResult<Option<bool>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(GradeError::validation(format!("{key} must be boolean"))),
    }
}

pub fn id_list(params: &Value, key: &str) -> GradeResult<Vec<i64>> {
    let Some(items) = params.get(key).and_then(|v| v.as_array()) else {
        return Err(GradeError::validation(format!("{key} must be an array of ids")));
    };
    items
        .iter()
        .map(|v| id_value(v, key)?.ok_or_else(|| GradeError::validation(format!("{key} contains null"))))
        .collect()
}

/// A grade component: number, numeric string, `null` or `""`. Range checks
/// happen in the grade model.
pub fn component(params: &Value, key: &str, label: &str) -> GradeResult<Option<f64>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| GradeError::validation(format!("invalid {label} value"))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .map(Some)
            .map_err(|_| GradeError::validation(format!("invalid {label} value '{}'", s.trim()))),
        Some(_) => Err(GradeError::validation(format!("invalid {label} value"))),
    }
}

/// Requested page size, or `fallback` when absent; clamped to 1..=500.
pub fn page_size(params: &Value, fallback: i64) -> GradeResult<i64> {
    Ok(opt_i64(params, "pageSize")?.unwrap_or(fallback).clamp(1, 500))
}

pub fn page(params: &Value) -> GradeResult<i64> {
    Ok(opt_i64(params, "page")?.unwrap_or(1))
}
