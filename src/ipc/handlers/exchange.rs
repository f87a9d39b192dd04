use crate::access::require_manage;
use crate::catalog;
use crate::error::{GradeError, GradeResult};
use crate::exchange;
use crate::ipc::error::reply;
use crate::ipc::handlers::setup::exchange_max_rows;
use crate::ipc::helpers::{current_actor, get_id, opt_str, require_db};
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Value};
use std::path::PathBuf;

fn handle_import_grades_csv(state: &mut AppState, req: &Request) -> GradeResult<Value> {
    let conn = require_db(state)?;
    let actor = current_actor(state, conn)?;
    let course_unit_id = get_id(&req.params, "courseUnitId")?;
    let unit = catalog::require_course_unit(conn, course_unit_id)?;
    require_manage(conn, &actor, unit.id)?;

    let max_rows = exchange_max_rows(conn)?;
    let rows = match (
        opt_str(&req.params, "inPath").filter(|s| !s.is_empty()),
        req.params.get("csvText").and_then(|v| v.as_str()),
    ) {
        (Some(path), _) => {
            let file = std::fs::File::open(&path)?;
            exchange::read_rows(file, max_rows)?
        }
        (None, Some(text)) => exchange::read_rows(text.as_bytes(), max_rows)?,
        (None, None) => return Err(GradeError::validation("missing inPath or csvText")),
    };

    let summary = exchange::import_grades(conn, &unit, &rows);
    Ok(serde_json::to_value(summary).unwrap_or(Value::Null))
}

fn handle_export_grades_csv(state: &mut AppState, req: &Request) -> GradeResult<Value> {
    let conn = require_db(state)?;
    let actor = current_actor(state, conn)?;
    let course_unit_id = get_id(&req.params, "courseUnitId")?;
    let level_id = get_id(&req.params, "levelId")?;
    let out_path = opt_str(&req.params, "outPath")
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| GradeError::validation("missing outPath"))?;

    let unit = catalog::require_course_unit(conn, course_unit_id)?;
    catalog::level_name(conn, level_id)?.ok_or(GradeError::NotFound("level"))?;
    require_manage(conn, &actor, unit.id)?;

    if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(&out_path)?;
    let rows_exported = exchange::export_grades(conn, unit.id, level_id, file)?;
    tracing::info!(course_unit = %unit.code, level_id, rows_exported, "grades exported");
    Ok(json!({
        "rowsExported": rows_exported,
        "path": out_path.to_string_lossy()
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let outcome = match req.method.as_str() {
        "exchange.importGradesCsv" => handle_import_grades_csv(state, req),
        "exchange.exportGradesCsv" => handle_export_grades_csv(state, req),
        _ => return None,
    };
    Some(reply(&req.id, &req.method, outcome))
}
