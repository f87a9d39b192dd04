use crate::access::require_manage;
use crate::calc::Components;
use crate::catalog;
use crate::directory::{self, TableQuery};
use crate::error::{GradeError, GradeResult};
use crate::grades;
use crate::ipc::error::reply;
use crate::ipc::handlers::setup::grade_table_page_size;
use crate::ipc::helpers::{component, current_actor, get_id, opt_id, page, page_size, require_db};
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Value};

fn read_components(params: &Value) -> GradeResult<Components> {
    Components::validated(
        component(params, "cc", "CC")?,
        component(params, "tp", "TP")?,
        component(params, "sn", "SN")?,
    )
}

fn handle_table(state: &mut AppState, req: &Request) -> GradeResult<Value> {
    let conn = require_db(state)?;
    let actor = current_actor(state, conn)?;
    let p = &req.params;
    let query = TableQuery {
        department_id: opt_id(p, "departmentId")?,
        program_id: opt_id(p, "programId")?,
        level_id: opt_id(p, "levelId")?,
        page: page(p)?,
        page_size: page_size(p, grade_table_page_size(conn)?)?,
    };
    let model = directory::grade_table(conn, &actor, &query)?;
    Ok(serde_json::to_value(model).unwrap_or(Value::Null))
}

fn handle_get(state: &mut AppState, req: &Request) -> GradeResult<Value> {
    let conn = require_db(state)?;
    let grade = grades::load_grade(conn, get_id(&req.params, "gradeId")?)?
        .ok_or(GradeError::NotFound("grade"))?;
    Ok(json!({ "grade": grade }))
}

fn handle_create(state: &mut AppState, req: &Request) -> GradeResult<Value> {
    let conn = require_db(state)?;
    let actor = current_actor(state, conn)?;
    let student_id = get_id(&req.params, "studentId")?;
    let course_unit_id = get_id(&req.params, "courseUnitId")?;
    let components = read_components(&req.params)?;

    catalog::require_student(conn, student_id)?;
    catalog::require_course_unit(conn, course_unit_id)?;
    require_manage(conn, &actor, course_unit_id)?;

    let grade = grades::create_grade(conn, student_id, course_unit_id, components)?;
    tracing::debug!(grade_id = grade.grade_id, by = %actor.username, "grade created");
    Ok(json!({ "grade": grade }))
}

fn handle_update(state: &mut AppState, req: &Request) -> GradeResult<Value> {
    let conn = require_db(state)?;
    let actor = current_actor(state, conn)?;
    let grade_id = get_id(&req.params, "gradeId")?;
    let components = read_components(&req.params)?;

    let existing = grades::load_grade(conn, grade_id)?.ok_or(GradeError::NotFound("grade"))?;
    require_manage(conn, &actor, existing.course_unit_id)?;

    let grade = grades::update_grade(conn, grade_id, components)?;
    tracing::debug!(grade_id, by = %actor.username, "grade updated");
    Ok(json!({ "grade": grade }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let outcome = match req.method.as_str() {
        "grades.table" => handle_table(state, req),
        "grades.get" => handle_get(state, req),
        "grades.create" => handle_create(state, req),
        "grades.update" => handle_update(state, req),
        _ => return None,
    };
    Some(reply(&req.id, &req.method, outcome))
}
