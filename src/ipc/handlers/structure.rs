//! Departments, programs and levels: the cascade the directory filters by.

use crate::access::require_administer;
use crate::catalog;
use crate::error::GradeResult;
use crate::ipc::error::reply;
use crate::ipc::helpers::{current_actor, get_id, get_str, opt_id, require_db};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_departments_list(state: &mut AppState, _req: &Request) -> GradeResult<serde_json::Value> {
    let conn = require_db(state)?;
    Ok(json!({ "departments": catalog::list_departments(conn)? }))
}

fn handle_departments_create(state: &mut AppState, req: &Request) -> GradeResult<serde_json::Value> {
    let conn = require_db(state)?;
    require_administer(&current_actor(state, conn)?)?;
    let name = get_str(&req.params, "name")?;
    Ok(json!({ "department": catalog::create_department(conn, &name)? }))
}

fn handle_departments_delete(state: &mut AppState, req: &Request) -> GradeResult<serde_json::Value> {
    let conn = require_db(state)?;
    require_administer(&current_actor(state, conn)?)?;
    catalog::delete_department(conn, get_id(&req.params, "departmentId")?)?;
    Ok(json!({ "ok": true }))
}

fn handle_programs_list(state: &mut AppState, req: &Request) -> GradeResult<serde_json::Value> {
    let conn = require_db(state)?;
    let department_id = opt_id(&req.params, "departmentId")?;
    Ok(json!({ "programs": catalog::list_programs(conn, department_id)? }))
}

fn handle_programs_create(state: &mut AppState, req: &Request) -> GradeResult<serde_json::Value> {
    let conn = require_db(state)?;
    require_administer(&current_actor(state, conn)?)?;
    let name = get_str(&req.params, "name")?;
    let department_id = get_id(&req.params, "departmentId")?;
    Ok(json!({ "program": catalog::create_program(conn, &name, department_id)? }))
}

fn handle_programs_delete(state: &mut AppState, req: &Request) -> GradeResult<serde_json::Value> {
    let conn = require_db(state)?;
    require_administer(&current_actor(state, conn)?)?;
    catalog::delete_program(conn, get_id(&req.params, "programId")?)?;
    Ok(json!({ "ok": true }))
}

fn handle_levels_list(state: &mut AppState, req: &Request) -> GradeResult<serde_json::Value> {
    let conn = require_db(state)?;
    let program_id = opt_id(&req.params, "programId")?;
    Ok(json!({ "levels": catalog::list_levels(conn, program_id)? }))
}

fn handle_levels_create(state: &mut AppState, req: &Request) -> GradeResult<serde_json::Value> {
    let conn = require_db(state)?;
    require_administer(&current_actor(state, conn)?)?;
    let name = get_str(&req.params, "name")?;
    Ok(json!({ "level": catalog::create_level(conn, &name)? }))
}

fn handle_levels_delete(state: &mut AppState, req: &Request) -> GradeResult<serde_json::Value> {
    let conn = require_db(state)?;
    require_administer(&current_actor(state, conn)?)?;
    catalog::delete_level(conn, get_id(&req.params, "levelId")?)?;
    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let outcome = match req.method.as_str() {
        "departments.list" => handle_departments_list(state, req),
        "departments.create" => handle_departments_create(state, req),
        "departments.delete" => handle_departments_delete(state, req),
        "programs.list" => handle_programs_list(state, req),
        "programs.create" => handle_programs_create(state, req),
        "programs.delete" => handle_programs_delete(state, req),
        "levels.list" => handle_levels_list(state, req),
        "levels.create" => handle_levels_create(state, req),
        "levels.delete" => handle_levels_delete(state, req),
        _ => return None,
    };
    Some(reply(&req.id, &req.method, outcome))
}
