//! Departments, programs (filières), levels (niveaux), course units and
//! students. Program and level references on students and units are
//! optional: deleting the referenced row leaves them unclassified.

use crate::calc::Weights;
use crate::error::{is_unique_violation, GradeError, GradeResult};
use rusqlite::{Connection, OptionalExtension, Row};
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NamedOption {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CourseUnit {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub credit: i64,
    pub program_id: Option<i64>,
    pub level_id: Option<i64>,
    pub semester: i64,
    pub weights: Weights,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub matricule: String,
    pub program_id: Option<i64>,
    pub level_id: Option<i64>,
}

pub const COURSE_UNIT_COLUMNS: &str = "cu.id, cu.code, cu.name, cu.credit, cu.program_id, cu.level_id, cu.semester, cu.cc_weight, cu.tp_weight, cu.sn_weight";
pub const COURSE_UNIT_COLUMN_COUNT: usize = 10;

pub fn course_unit_from_row(r: &Row<'_>) -> rusqlite::Result<CourseUnit> {
    Ok(CourseUnit {
        id: r.get(0)?,
        code: r.get(1)?,
        name: r.get(2)?,
        credit: r.get(3)?,
        program_id: r.get(4)?,
        level_id: r.get(5)?,
        semester: r.get(6)?,
        weights: Weights {
            cc: r.get(7)?,
            tp: r.get(8)?,
            sn: r.get(9)?,
        },
    })
}

fn student_from_row(r: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: r.get(0)?,
        name: r.get(1)?,
        matricule: r.get(2)?,
        program_id: r.get(3)?,
        level_id: r.get(4)?,
    })
}

fn non_empty(value: &str, field: &str) -> GradeResult<String> {
    let v = value.trim();
    if v.is_empty() {
        return Err(GradeError::validation(format!("{field} must not be empty")));
    }
    Ok(v.to_string())
}

fn conflict_or(e: rusqlite::Error, message: &str) -> GradeError {
    if is_unique_violation(&e) {
        GradeError::Conflict(message.to_string())
    } else {
        e.into()
    }
}

fn exists(conn: &Connection, table: &str, id: i64) -> GradeResult<bool> {
    let sql = format!("SELECT 1 FROM {} WHERE id = ?", table);
    let found: Option<i64> = conn.query_row(&sql, [id], |r| r.get(0)).optional()?;
    Ok(found.is_some())
}

fn require_ref(conn: &Connection, table: &str, id: Option<i64>, what: &'static str) -> GradeResult<()> {
    if let Some(id) = id {
        if !exists(conn, table, id)? {
            return Err(GradeError::NotFound(what));
        }
    }
    Ok(())
}

fn named_options(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> GradeResult<Vec<NamedOption>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, |r| {
            Ok(NamedOption {
                id: r.get(0)?,
                name: r.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ---- departments / programs / levels ----

pub fn list_departments(conn: &Connection) -> GradeResult<Vec<NamedOption>> {
    named_options(conn, "SELECT id, name FROM departments ORDER BY id", [])
}

pub fn create_department(conn: &Connection, name: &str) -> GradeResult<NamedOption> {
    let name = non_empty(name, "name")?;
    conn.execute("INSERT INTO departments(name) VALUES(?)", [&name])
        .map_err(|e| conflict_or(e, "department already exists"))?;
    Ok(NamedOption {
        id: conn.last_insert_rowid(),
        name,
    })
}

/// Programs of the department go with it; their students and units are
/// left unclassified.
pub fn delete_department(conn: &Connection, id: i64) -> GradeResult<()> {
    if conn.execute("DELETE FROM departments WHERE id = ?", [id])? == 0 {
        return Err(GradeError::NotFound("department"));
    }
    Ok(())
}

pub fn list_programs(conn: &Connection, department_id: Option<i64>) -> GradeResult<Vec<NamedOption>> {
    match department_id {
        Some(dep) => named_options(
            conn,
            "SELECT id, name FROM programs WHERE department_id = ? ORDER BY id",
            [dep],
        ),
        None => named_options(conn, "SELECT id, name FROM programs ORDER BY id", []),
    }
}

pub fn create_program(conn: &Connection, name: &str, department_id: i64) -> GradeResult<NamedOption> {
    let name = non_empty(name, "name")?;
    require_ref(conn, "departments", Some(department_id), "department")?;
    conn.execute(
        "INSERT INTO programs(name, department_id) VALUES(?, ?)",
        (&name, department_id),
    )
    .map_err(|e| conflict_or(e, "program already exists in this department"))?;
    Ok(NamedOption {
        id: conn.last_insert_rowid(),
        name,
    })
}

pub fn delete_program(conn: &Connection, id: i64) -> GradeResult<()> {
    if conn.execute("DELETE FROM programs WHERE id = ?", [id])? == 0 {
        return Err(GradeError::NotFound("program"));
    }
    Ok(())
}

/// Levels offered for a program are the levels its students are enrolled
/// in; without a program every level is listed.
pub fn list_levels(conn: &Connection, program_id: Option<i64>) -> GradeResult<Vec<NamedOption>> {
    match program_id {
        Some(p) => named_options(
            conn,
            "SELECT DISTINCT l.id, l.name
             FROM levels l
             JOIN students s ON s.level_id = l.id
             WHERE s.program_id = ?
             ORDER BY l.id",
            [p],
        ),
        None => named_options(conn, "SELECT id, name FROM levels ORDER BY id", []),
    }
}

pub fn create_level(conn: &Connection, name: &str) -> GradeResult<NamedOption> {
    let name = non_empty(name, "name")?;
    conn.execute("INSERT INTO levels(name) VALUES(?)", [&name])
        .map_err(|e| conflict_or(e, "level already exists"))?;
    Ok(NamedOption {
        id: conn.last_insert_rowid(),
        name,
    })
}

pub fn delete_level(conn: &Connection, id: i64) -> GradeResult<()> {
    if conn.execute("DELETE FROM levels WHERE id = ?", [id])? == 0 {
        return Err(GradeError::NotFound("level"));
    }
    Ok(())
}

pub fn level_name(conn: &Connection, id: i64) -> GradeResult<Option<String>> {
    let name = conn
        .query_row("SELECT name FROM levels WHERE id = ?", [id], |r| r.get(0))
        .optional()?;
    Ok(name)
}

pub fn program_name(conn: &Connection, id: i64) -> GradeResult<Option<String>> {
    let name = conn
        .query_row("SELECT name FROM programs WHERE id = ?", [id], |r| r.get(0))
        .optional()?;
    Ok(name)
}

// ---- course units ----

#[derive(Debug, Clone, Default)]
pub struct CourseUnitPatch {
    pub code: Option<String>,
    pub name: Option<String>,
    pub credit: Option<i64>,
    pub program_id: Option<Option<i64>>,
    pub level_id: Option<Option<i64>>,
    pub semester: Option<i64>,
    pub cc_weight: Option<u32>,
    pub tp_weight: Option<u32>,
    pub sn_weight: Option<u32>,
}

fn check_credit(credit: i64) -> GradeResult<i64> {
    if credit <= 0 {
        return Err(GradeError::validation("credit must be a positive integer"));
    }
    Ok(credit)
}

fn check_semester(semester: i64) -> GradeResult<i64> {
    if semester != 1 && semester != 2 {
        return Err(GradeError::validation("semester must be 1 or 2"));
    }
    Ok(semester)
}

/// Merges `patch` over `base` and validates the result as a whole. Weights
/// are checked on the merged triple so a partial weight edit cannot leave
/// an invalid configuration behind.
fn merge_course_unit(base: CourseUnit, patch: CourseUnitPatch) -> GradeResult<CourseUnit> {
    let weights = Weights::validate(
        patch.cc_weight.unwrap_or(base.weights.cc),
        patch.tp_weight.unwrap_or(base.weights.tp),
        patch.sn_weight.unwrap_or(base.weights.sn),
    )?;
    Ok(CourseUnit {
        id: base.id,
        code: non_empty(patch.code.as_deref().unwrap_or(base.code.as_str()), "code")?,
        name: non_empty(patch.name.as_deref().unwrap_or(base.name.as_str()), "name")?,
        credit: check_credit(patch.credit.unwrap_or(base.credit))?,
        program_id: patch.program_id.unwrap_or(base.program_id),
        level_id: patch.level_id.unwrap_or(base.level_id),
        semester: check_semester(patch.semester.unwrap_or(base.semester))?,
        weights,
    })
}

pub fn load_course_unit(conn: &Connection, id: i64) -> GradeResult<Option<CourseUnit>> {
    let sql = format!(
        "SELECT {} FROM course_units cu WHERE cu.id = ?",
        COURSE_UNIT_COLUMNS
    );
    let unit = conn
        .query_row(&sql, [id], course_unit_from_row)
        .optional()?;
    Ok(unit)
}

pub fn require_course_unit(conn: &Connection, id: i64) -> GradeResult<CourseUnit> {
    load_course_unit(conn, id)?.ok_or(GradeError::NotFound("course unit"))
}

pub fn list_course_units(
    conn: &Connection,
    program_id: Option<i64>,
    level_id: Option<i64>,
    semester: Option<i64>,
) -> GradeResult<Vec<CourseUnit>> {
    let sql = format!(
        "SELECT {} FROM course_units cu
         WHERE (?1 IS NULL OR cu.program_id = ?1)
           AND (?2 IS NULL OR cu.level_id = ?2)
           AND (?3 IS NULL OR cu.semester = ?3)
         ORDER BY cu.code",
        COURSE_UNIT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map((program_id, level_id, semester), course_unit_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Units matching the student's program and level. Empty while the student
/// is unclassified on either axis.
pub fn course_units_for_student(conn: &Connection, student_id: i64) -> GradeResult<Vec<CourseUnit>> {
    let student = require_student(conn, student_id)?;
    let (Some(program), Some(level)) = (student.program_id, student.level_id) else {
        return Ok(Vec::new());
    };
    let sql = format!(
        "SELECT {} FROM course_units cu
         WHERE cu.program_id = ? AND cu.level_id = ?
         ORDER BY cu.code",
        COURSE_UNIT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map((program, level), course_unit_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn create_course_unit(conn: &Connection, patch: CourseUnitPatch) -> GradeResult<CourseUnit> {
    let base = CourseUnit {
        id: 0,
        code: String::new(),
        name: String::new(),
        credit: 0,
        program_id: None,
        level_id: None,
        semester: 1,
        weights: Weights::default(),
    };
    let unit = merge_course_unit(base, patch)?;
    require_ref(conn, "programs", unit.program_id, "program")?;
    require_ref(conn, "levels", unit.level_id, "level")?;
    conn.execute(
        "INSERT INTO course_units(code, name, credit, program_id, level_id, semester,
                                  cc_weight, tp_weight, sn_weight)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &unit.code,
            &unit.name,
            unit.credit,
            unit.program_id,
            unit.level_id,
            unit.semester,
            unit.weights.cc,
            unit.weights.tp,
            unit.weights.sn,
        ),
    )
    .map_err(|e| conflict_or(e, "course unit code already exists"))?;
    require_course_unit(conn, conn.last_insert_rowid())
}

pub fn update_course_unit(conn: &Connection, id: i64, patch: CourseUnitPatch) -> GradeResult<CourseUnit> {
    let base = require_course_unit(conn, id)?;
    let unit = merge_course_unit(base, patch)?;
    require_ref(conn, "programs", unit.program_id, "program")?;
    require_ref(conn, "levels", unit.level_id, "level")?;
    conn.execute(
        "UPDATE course_units SET code = ?, name = ?, credit = ?, program_id = ?, level_id = ?,
                                 semester = ?, cc_weight = ?, tp_weight = ?, sn_weight = ?
         WHERE id = ?",
        (
            &unit.code,
            &unit.name,
            unit.credit,
            unit.program_id,
            unit.level_id,
            unit.semester,
            unit.weights.cc,
            unit.weights.tp,
            unit.weights.sn,
            id,
        ),
    )
    .map_err(|e| conflict_or(e, "course unit code already exists"))?;
    Ok(unit)
}

/// Removes the unit together with its grades and instructor links.
pub fn delete_course_unit(conn: &Connection, id: i64) -> GradeResult<()> {
    if conn.execute("DELETE FROM course_units WHERE id = ?", [id])? == 0 {
        return Err(GradeError::NotFound("course unit"));
    }
    Ok(())
}

/// Replaces the instructor set in one transaction.
pub fn set_instructors(conn: &Connection, course_unit_id: i64, user_ids: &[i64]) -> GradeResult<Vec<i64>> {
    require_course_unit(conn, course_unit_id)?;
    for uid in user_ids {
        if !exists(conn, "users", *uid)? {
            return Err(GradeError::NotFound("user"));
        }
    }
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "DELETE FROM course_unit_instructors WHERE course_unit_id = ?",
        [course_unit_id],
    )?;
    for uid in user_ids {
        tx.execute(
            "INSERT OR IGNORE INTO course_unit_instructors(course_unit_id, user_id) VALUES(?, ?)",
            (course_unit_id, uid),
        )?;
    }
    tx.commit()?;
    crate::access::instructor_ids(conn, course_unit_id)
}

// ---- students ----

#[derive(Debug, Clone, Default)]
pub struct StudentPatch {
    pub name: Option<String>,
    pub matricule: Option<String>,
    pub program_id: Option<Option<i64>>,
    pub level_id: Option<Option<i64>>,
}

pub fn load_student(conn: &Connection, id: i64) -> GradeResult<Option<Student>> {
    let student = conn
        .query_row(
            "SELECT id, name, matricule, program_id, level_id FROM students WHERE id = ?",
            [id],
            student_from_row,
        )
        .optional()?;
    Ok(student)
}

pub fn require_student(conn: &Connection, id: i64) -> GradeResult<Student> {
    load_student(conn, id)?.ok_or(GradeError::NotFound("student"))
}

pub fn find_student_by_matricule(conn: &Connection, matricule: &str) -> GradeResult<Option<Student>> {
    let student = conn
        .query_row(
            "SELECT id, name, matricule, program_id, level_id FROM students WHERE matricule = ?",
            [matricule],
            student_from_row,
        )
        .optional()?;
    Ok(student)
}

fn merge_student(base: Student, patch: StudentPatch) -> GradeResult<Student> {
    Ok(Student {
        id: base.id,
        name: non_empty(patch.name.as_deref().unwrap_or(base.name.as_str()), "name")?,
        matricule: non_empty(
            patch.matricule.as_deref().unwrap_or(base.matricule.as_str()),
            "matricule",
        )?,
        program_id: patch.program_id.unwrap_or(base.program_id),
        level_id: patch.level_id.unwrap_or(base.level_id),
    })
}

pub fn create_student(conn: &Connection, patch: StudentPatch) -> GradeResult<Student> {
    let base = Student {
        id: 0,
        name: String::new(),
        matricule: String::new(),
        program_id: None,
        level_id: None,
    };
    let s = merge_student(base, patch)?;
    require_ref(conn, "programs", s.program_id, "program")?;
    require_ref(conn, "levels", s.level_id, "level")?;
    conn.execute(
        "INSERT INTO students(name, matricule, program_id, level_id) VALUES(?, ?, ?, ?)",
        (&s.name, &s.matricule, s.program_id, s.level_id),
    )
    .map_err(|e| conflict_or(e, "matricule already exists"))?;
    require_student(conn, conn.last_insert_rowid())
}

pub fn update_student(conn: &Connection, id: i64, patch: StudentPatch) -> GradeResult<Student> {
    let base = require_student(conn, id)?;
    let s = merge_student(base, patch)?;
    require_ref(conn, "programs", s.program_id, "program")?;
    require_ref(conn, "levels", s.level_id, "level")?;
    conn.execute(
        "UPDATE students SET name = ?, matricule = ?, program_id = ?, level_id = ? WHERE id = ?",
        (&s.name, &s.matricule, s.program_id, s.level_id, id),
    )
    .map_err(|e| conflict_or(e, "matricule already exists"))?;
    Ok(s)
}

pub fn delete_student(conn: &Connection, id: i64) -> GradeResult<()> {
    if conn.execute("DELETE FROM students WHERE id = ?", [id])? == 0 {
        return Err(GradeError::NotFound("student"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit() -> CourseUnit {
        CourseUnit {
            id: 1,
            code: "UE101".into(),
            name: "Algo".into(),
            credit: 6,
            program_id: None,
            level_id: None,
            semester: 1,
            weights: Weights::default(),
        }
    }

    #[test]
    fn partial_weight_edit_is_checked_against_the_merged_triple() {
        let patch = CourseUnitPatch {
            cc_weight: Some(30),
            ..Default::default()
        };
        let e = merge_course_unit(unit(), patch).expect_err("30+30+50");
        assert_eq!(e.code(), "bad_params");

        let patch = CourseUnitPatch {
            cc_weight: Some(30),
            sn_weight: Some(40),
            ..Default::default()
        };
        let merged = merge_course_unit(unit(), patch).expect("30+30+40");
        assert_eq!(merged.weights, Weights { cc: 30, tp: 30, sn: 40 });
    }

    #[test]
    fn credit_and_semester_are_bounded() {
        let zero_credit = CourseUnitPatch {
            credit: Some(0),
            ..Default::default()
        };
        assert!(merge_course_unit(unit(), zero_credit).is_err());
        let bad_semester = CourseUnitPatch {
            semester: Some(3),
            ..Default::default()
        };
        assert!(merge_course_unit(unit(), bad_semester).is_err());
    }

    #[test]
    fn clearing_program_is_distinct_from_leaving_it() {
        let mut base = unit();
        base.program_id = Some(4);
        let keep = merge_course_unit(base.clone(), CourseUnitPatch::default()).expect("keep");
        assert_eq!(keep.program_id, Some(4));
        let clear = CourseUnitPatch {
            program_id: Some(None),
            ..Default::default()
        };
        assert_eq!(merge_course_unit(base, clear).expect("clear").program_id, None);
    }
}
