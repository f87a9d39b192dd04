//! Per-student transcript: one line per graded course unit plus the
//! credit-weighted average.

use crate::calc::{self, CourseUnitTerms, GradeRecord};
use crate::catalog;
use crate::error::GradeResult;
use crate::grades;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;

pub const STATUS_PASSED: &str = "Valide";
pub const STATUS_ELIMINATED: &str = "Éliminé";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptHeader {
    pub student_id: i64,
    pub name: String,
    pub matricule: String,
    pub program: Option<String>,
    pub level: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptLine {
    pub course_unit_id: i64,
    pub code: String,
    pub name: String,
    pub credit: i64,
    pub cc: Option<f64>,
    pub tp: Option<f64>,
    pub sn: Option<f64>,
    #[serde(rename = "final")]
    pub final_mark: Option<f64>,
    pub status: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    pub student: TranscriptHeader,
    pub lines: Vec<TranscriptLine>,
    pub average: Option<f64>,
    pub generated_at: String,
}

/// Credit-weighted average over the student's non-eliminated grades.
pub fn student_average(conn: &Connection, student_id: i64) -> GradeResult<Option<f64>> {
    catalog::require_student(conn, student_id)?;
    let rows = grades::student_grades(conn, student_id)?;
    let mut terms = HashMap::with_capacity(rows.len());
    let mut records = Vec::with_capacity(rows.len());
    for (unit, view) in rows {
        terms.insert(
            unit.id,
            CourseUnitTerms {
                credit: unit.credit,
                weights: unit.weights,
            },
        );
        records.push(GradeRecord {
            course_unit_id: unit.id,
            components: calc::Components::new(view.cc, view.tp, view.sn),
        });
    }
    Ok(calc::aggregate(&records, &terms))
}

pub fn transcript_model(conn: &Connection, student_id: i64) -> GradeResult<Transcript> {
    let student = catalog::require_student(conn, student_id)?;
    let program = match student.program_id {
        Some(id) => catalog::program_name(conn, id)?,
        None => None,
    };
    let level = match student.level_id {
        Some(id) => catalog::level_name(conn, id)?,
        None => None,
    };

    let rows = grades::student_grades(conn, student_id)?;
    let average = calc::transcript_average(rows.iter().map(|(u, g)| (g.final_mark, u.credit)));
    let lines = rows
        .into_iter()
        .map(|(unit, grade)| TranscriptLine {
            course_unit_id: unit.id,
            code: unit.code,
            name: unit.name,
            credit: unit.credit,
            cc: grade.cc,
            tp: grade.tp,
            sn: grade.sn,
            final_mark: grade.final_mark,
            status: if grade.is_eliminated {
                STATUS_ELIMINATED
            } else {
                STATUS_PASSED
            },
        })
        .collect();

    Ok(Transcript {
        student: TranscriptHeader {
            student_id: student.id,
            name: student.name,
            matricule: student.matricule,
            program,
            level,
        },
        lines,
        average,
        generated_at: chrono::Local::now().format("%d/%m/%Y %H:%M").to_string(),
    })
}
