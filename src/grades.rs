//! Grade persistence. A grade row stores only the three components;
//! `final` and `isEliminated` are derived from the owning unit's current
//! weights every time a grade is read.

use crate::calc::{compute_final, is_eliminated, Components, Weights};
use crate::catalog;
use crate::error::{is_unique_violation, GradeError, GradeResult};
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GradeView {
    pub grade_id: i64,
    pub student_id: i64,
    pub course_unit_id: i64,
    pub cc: Option<f64>,
    pub tp: Option<f64>,
    pub sn: Option<f64>,
    #[serde(rename = "final")]
    pub final_mark: Option<f64>,
    pub is_eliminated: bool,
}

impl GradeView {
    pub fn derive(
        grade_id: i64,
        student_id: i64,
        course_unit_id: i64,
        components: Components,
        weights: Weights,
    ) -> Self {
        Self {
            grade_id,
            student_id,
            course_unit_id,
            cc: components.cc,
            tp: components.tp,
            sn: components.sn,
            final_mark: compute_final(&components, weights),
            is_eliminated: is_eliminated(&components),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    Created,
    Updated,
}

fn now_stamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub fn load_grade(conn: &Connection, grade_id: i64) -> GradeResult<Option<GradeView>> {
    let row = conn
        .query_row(
            "SELECT g.id, g.student_id, g.course_unit_id, g.cc, g.tp, g.sn,
                    cu.cc_weight, cu.tp_weight, cu.sn_weight
             FROM grades g
             JOIN course_units cu ON cu.id = g.course_unit_id
             WHERE g.id = ?",
            [grade_id],
            |r| {
                Ok(GradeView::derive(
                    r.get(0)?,
                    r.get(1)?,
                    r.get(2)?,
                    Components::new(r.get(3)?, r.get(4)?, r.get(5)?),
                    Weights {
                        cc: r.get(6)?,
                        tp: r.get(7)?,
                        sn: r.get(8)?,
                    },
                ))
            },
        )
        .optional()?;
    Ok(row)
}

fn require_grade(conn: &Connection, grade_id: i64) -> GradeResult<GradeView> {
    load_grade(conn, grade_id)?.ok_or(GradeError::NotFound("grade"))
}

/// Inserts a new grade. An existing (student, unit) pair is a conflict,
/// never an overwrite.
pub fn create_grade(
    conn: &Connection,
    student_id: i64,
    course_unit_id: i64,
    components: Components,
) -> GradeResult<GradeView> {
    let inserted = conn.execute(
        "INSERT INTO grades(student_id, course_unit_id, cc, tp, sn, updated_at)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            student_id,
            course_unit_id,
            components.cc,
            components.tp,
            components.sn,
            now_stamp(),
        ),
    );
    match inserted {
        Ok(_) => require_grade(conn, conn.last_insert_rowid()),
        Err(e) if is_unique_violation(&e) => Err(GradeError::Conflict(
            "grade already exists for this student and course unit".to_string(),
        )),
        Err(e) => Err(e.into()),
    }
}

/// Replaces all three components of an existing grade.
pub fn update_grade(conn: &Connection, grade_id: i64, components: Components) -> GradeResult<GradeView> {
    let changed = conn.execute(
        "UPDATE grades SET cc = ?, tp = ?, sn = ?, updated_at = ? WHERE id = ?",
        (
            components.cc,
            components.tp,
            components.sn,
            now_stamp(),
            grade_id,
        ),
    )?;
    if changed == 0 {
        return Err(GradeError::NotFound("grade"));
    }
    require_grade(conn, grade_id)
}

/// Create-or-update keyed on (student, unit). Each call is one statement,
/// so a failure leaves the previous row untouched.
pub fn upsert_grade(
    conn: &Connection,
    student_id: i64,
    course_unit_id: i64,
    components: Components,
) -> GradeResult<Upserted> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM grades WHERE student_id = ? AND course_unit_id = ?",
            (student_id, course_unit_id),
            |r| r.get(0),
        )
        .optional()?;
    match existing {
        Some(id) => {
            conn.execute(
                "UPDATE grades SET cc = ?, tp = ?, sn = ?, updated_at = ? WHERE id = ?",
                (components.cc, components.tp, components.sn, now_stamp(), id),
            )?;
            Ok(Upserted::Updated)
        }
        None => {
            conn.execute(
                "INSERT INTO grades(student_id, course_unit_id, cc, tp, sn, updated_at)
                 VALUES(?, ?, ?, ?, ?, ?)",
                (
                    student_id,
                    course_unit_id,
                    components.cc,
                    components.tp,
                    components.sn,
                    now_stamp(),
                ),
            )?;
            Ok(Upserted::Created)
        }
    }
}

/// Every grade of one student joined with its unit, ordered by unit code.
pub fn student_grades(conn: &Connection, student_id: i64) -> GradeResult<Vec<(catalog::CourseUnit, GradeView)>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {}, g.id, g.cc, g.tp, g.sn
         FROM grades g
         JOIN course_units cu ON cu.id = g.course_unit_id
         WHERE g.student_id = ?
         ORDER BY cu.code",
        catalog::COURSE_UNIT_COLUMNS
    ))?;
    let rows = stmt
        .query_map([student_id], |r| {
            let unit = catalog::course_unit_from_row(r)?;
            let view = GradeView::derive(
                r.get(catalog::COURSE_UNIT_COLUMN_COUNT)?,
                student_id,
                unit.id,
                Components::new(
                    r.get(catalog::COURSE_UNIT_COLUMN_COUNT + 1)?,
                    r.get(catalog::COURSE_UNIT_COLUMN_COUNT + 2)?,
                    r.get(catalog::COURSE_UNIT_COLUMN_COUNT + 3)?,
                ),
                unit.weights,
            );
            Ok((unit, view))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
