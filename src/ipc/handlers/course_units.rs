use crate::access::{instructor_ids, require_administer};
use crate::catalog::{self, CourseUnitPatch};
use crate::error::GradeResult;
use crate::ipc::error::reply;
use crate::ipc::helpers::{
    current_actor, get_id, id_list, opt_i64, opt_id, opt_str, opt_u32, patch_id, require_db,
};
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Value};

fn read_patch(params: &Value) -> GradeResult<CourseUnitPatch> {
    Ok(CourseUnitPatch {
        code: opt_str(params, "code"),
        name: opt_str(params, "name"),
        credit: opt_i64(params, "credit")?,
        program_id: patch_id(params, "programId")?,
        level_id: patch_id(params, "levelId")?,
        semester: opt_i64(params, "semester")?,
        cc_weight: opt_u32(params, "ccWeight")?,
        tp_weight: opt_u32(params, "tpWeight")?,
        sn_weight: opt_u32(params, "snWeight")?,
    })
}

fn handle_list(state: &mut AppState, req: &Request) -> GradeResult<Value> {
    let conn = require_db(state)?;
    let units = catalog::list_course_units(
        conn,
        opt_id(&req.params, "programId")?,
        opt_id(&req.params, "levelId")?,
        opt_i64(&req.params, "semester")?,
    )?;
    Ok(json!({ "courseUnits": units }))
}

fn handle_get(state: &mut AppState, req: &Request) -> GradeResult<Value> {
    let conn = require_db(state)?;
    let unit = catalog::require_course_unit(conn, get_id(&req.params, "courseUnitId")?)?;
    let instructors = instructor_ids(conn, unit.id)?;
    Ok(json!({ "courseUnit": unit, "instructorIds": instructors }))
}

fn handle_create(state: &mut AppState, req: &Request) -> GradeResult<Value> {
    let conn = require_db(state)?;
    require_administer(&current_actor(state, conn)?)?;
    let unit = catalog::create_course_unit(conn, read_patch(&req.params)?)?;
    Ok(json!({ "courseUnit": unit }))
}

fn handle_update(state: &mut AppState, req: &Request) -> GradeResult<Value> {
    let conn = require_db(state)?;
    require_administer(&current_actor(state, conn)?)?;
    let id = get_id(&req.params, "courseUnitId")?;
    let patch = req.params.get("patch").unwrap_or(&req.params);
    let unit = catalog::update_course_unit(conn, id, read_patch(patch)?)?;
    Ok(json!({ "courseUnit": unit }))
}

fn handle_delete(state: &mut AppState, req: &Request) -> GradeResult<Value> {
    let conn = require_db(state)?;
    require_administer(&current_actor(state, conn)?)?;
    catalog::delete_course_unit(conn, get_id(&req.params, "courseUnitId")?)?;
    Ok(json!({ "ok": true }))
}

fn handle_set_instructors(state: &mut AppState, req: &Request) -> GradeResult<Value> {
    let conn = require_db(state)?;
    require_administer(&current_actor(state, conn)?)?;
    let id = get_id(&req.params, "courseUnitId")?;
    let user_ids = id_list(&req.params, "userIds")?;
    let assigned = catalog::set_instructors(conn, id, &user_ids)?;
    Ok(json!({ "courseUnitId": id, "instructorIds": assigned }))
}

fn handle_for_student(state: &mut AppState, req: &Request) -> GradeResult<Value> {
    let conn = require_db(state)?;
    let units = catalog::course_units_for_student(conn, get_id(&req.params, "studentId")?)?;
    Ok(json!({ "courseUnits": units }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let outcome = match req.method.as_str() {
        "courseUnits.list" => handle_list(state, req),
        "courseUnits.get" => handle_get(state, req),
        "courseUnits.create" => handle_create(state, req),
        "courseUnits.update" => handle_update(state, req),
        "courseUnits.delete" => handle_delete(state, req),
        "courseUnits.setInstructors" => handle_set_instructors(state, req),
        "courseUnits.forStudent" => handle_for_student(state, req),
        _ => return None,
    };
    Some(reply(&req.id, &req.method, outcome))
}
