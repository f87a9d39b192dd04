use crate::directory::{self, BrowseQuery};
use crate::error::GradeResult;
use crate::ipc::error::reply;
use crate::ipc::handlers::setup::directory_page_size;
use crate::ipc::helpers::{opt_i64, opt_id, opt_str, page, page_size, require_db};
use crate::ipc::types::{AppState, Request};
use serde_json::Value;

/// Public browsing view; no session needed.
fn handle_browse(state: &mut AppState, req: &Request) -> GradeResult<Value> {
    let conn = require_db(state)?;
    let p = &req.params;
    let query = BrowseQuery {
        department_id: opt_id(p, "departmentId")?,
        program_id: opt_id(p, "programId")?,
        level_id: opt_id(p, "levelId")?,
        semester: opt_i64(p, "semester")?,
        course_unit_id: opt_id(p, "courseUnitId")?,
        sort: opt_str(p, "sort"),
        page: page(p)?,
        page_size: page_size(p, directory_page_size(conn)?)?,
    };
    let model = directory::browse(conn, &query)?;
    Ok(serde_json::to_value(model).unwrap_or(Value::Null))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let outcome = match req.method.as_str() {
        "directory.browse" => handle_browse(state, req),
        _ => return None,
    };
    Some(reply(&req.id, &req.method, outcome))
}
