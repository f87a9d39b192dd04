use crate::calc::{Components, Weights};
use crate::error::GradeResult;
use crate::grades::GradeView;
use crate::ipc::error::reply;
use crate::ipc::helpers::require_db;
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::{json, Value};

const RECENT_GRADES: i64 = 5;

fn count(conn: &Connection, table: &str) -> GradeResult<i64> {
    let n = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?;
    Ok(n)
}

/// Dashboard counts plus the most recently created grades.
fn handle_home(state: &mut AppState, _req: &Request) -> GradeResult<Value> {
    let conn = require_db(state)?;
    let mut stmt = conn.prepare(
        "SELECT g.id, g.student_id, g.course_unit_id, g.cc, g.tp, g.sn,
                cu.cc_weight, cu.tp_weight, cu.sn_weight,
                s.name, s.matricule, cu.code
         FROM grades g
         JOIN students s ON s.id = g.student_id
         JOIN course_units cu ON cu.id = g.course_unit_id
         ORDER BY g.id DESC
         LIMIT ?",
    )?;
    let recent = stmt
        .query_map([RECENT_GRADES], |r| {
            let grade = GradeView::derive(
                r.get(0)?,
                r.get(1)?,
                r.get(2)?,
                Components::new(r.get(3)?, r.get(4)?, r.get(5)?),
                Weights {
                    cc: r.get(6)?,
                    tp: r.get(7)?,
                    sn: r.get(8)?,
                },
            );
            Ok(json!({
                "studentName": r.get::<_, String>(9)?,
                "matricule": r.get::<_, String>(10)?,
                "courseUnitCode": r.get::<_, String>(11)?,
                "grade": grade,
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(json!({
        "counts": {
            "departments": count(conn, "departments")?,
            "programs": count(conn, "programs")?,
            "levels": count(conn, "levels")?,
            "courseUnits": count(conn, "course_units")?,
            "students": count(conn, "students")?,
        },
        "recentGrades": recent
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let outcome = match req.method.as_str() {
        "stats.home" => handle_home(state, req),
        _ => return None,
    };
    Some(reply(&req.id, &req.method, outcome))
}
