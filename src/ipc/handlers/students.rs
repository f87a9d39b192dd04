use crate::access::require_administer;
use crate::catalog::{self, StudentPatch};
use crate::error::GradeResult;
use crate::ipc::error::reply;
use crate::ipc::helpers::{current_actor, get_id, opt_str, patch_id, require_db};
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Value};

fn read_patch(params: &Value) -> GradeResult<StudentPatch> {
    Ok(StudentPatch {
        name: opt_str(params, "name"),
        matricule: opt_str(params, "matricule"),
        program_id: patch_id(params, "programId")?,
        level_id: patch_id(params, "levelId")?,
    })
}

fn handle_get(state: &mut AppState, req: &Request) -> GradeResult<Value> {
    let conn = require_db(state)?;
    let student = catalog::require_student(conn, get_id(&req.params, "studentId")?)?;
    Ok(json!({ "student": student }))
}

fn handle_create(state: &mut AppState, req: &Request) -> GradeResult<Value> {
    let conn = require_db(state)?;
    require_administer(&current_actor(state, conn)?)?;
    let student = catalog::create_student(conn, read_patch(&req.params)?)?;
    Ok(json!({ "student": student }))
}

fn handle_update(state: &mut AppState, req: &Request) -> GradeResult<Value> {
    let conn = require_db(state)?;
    require_administer(&current_actor(state, conn)?)?;
    let id = get_id(&req.params, "studentId")?;
    let patch = req.params.get("patch").unwrap_or(&req.params);
    let student = catalog::update_student(conn, id, read_patch(patch)?)?;
    Ok(json!({ "student": student }))
}

fn handle_delete(state: &mut AppState, req: &Request) -> GradeResult<Value> {
    let conn = require_db(state)?;
    require_administer(&current_actor(state, conn)?)?;
    catalog::delete_student(conn, get_id(&req.params, "studentId")?)?;
    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let outcome = match req.method.as_str() {
        "students.get" => handle_get(state, req),
        "students.create" => handle_create(state, req),
        "students.update" => handle_update(state, req),
        "students.delete" => handle_delete(state, req),
        _ => return None,
    };
    Some(reply(&req.id, &req.method, outcome))
}
