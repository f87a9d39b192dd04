//! CSV grade exchange for one course unit.
//!
//! Import reads the whole table up front; once decoded, rows are applied one
//! at a time and a bad row only adds a message to the summary.

use crate::calc::{Components, SCORE_MAX, SCORE_MIN};
use crate::catalog::{self, CourseUnit};
use crate::error::{GradeError, GradeResult};
use crate::grades::{self, Upserted};
use rusqlite::Connection;
use serde::Serialize;
use std::io::{Read, Write};
use uuid::Uuid;

pub const EXCHANGE_HEADER: [&str; 5] = ["Nom", "Matricule", "CC", "TP", "SN"];
pub const DEFAULT_MAX_ROWS: usize = 5000;

/// One data row as text cells, positionally: name, matricule, cc, tp, sn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExchangeRow {
    /// 1-indexed, header excluded.
    pub row_no: usize,
    pub name: String,
    pub matricule: String,
    pub cc: String,
    pub tp: String,
    pub sn: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub batch_id: String,
    pub imported: usize,
    pub updated: usize,
    pub errors: Vec<String>,
}

pub fn read_rows<R: Read>(reader: R, max_rows: usize) -> GradeResult<Vec<ExchangeRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    // Row numbers follow sheet lines, so blank lines the reader skips still count.
    let header_line = rdr
        .headers()
        .map_err(|e| GradeError::Unreadable(e.to_string()))?
        .position()
        .map_or(1, |p| p.line());

    let mut rows = Vec::new();
    for (idx, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| GradeError::Unreadable(e.to_string()))?;
        let row_no = record
            .position()
            .and_then(|p| usize::try_from(p.line().saturating_sub(header_line)).ok())
            .unwrap_or(idx + 1);
        if rows.len() >= max_rows {
            return Err(GradeError::validation(format!(
                "too many rows (max {max_rows})"
            )));
        }
        let cell = |i: usize| record.get(i).unwrap_or("").to_string();
        rows.push(ExchangeRow {
            row_no,
            name: cell(0),
            matricule: cell(1),
            cc: cell(2),
            tp: cell(3),
            sn: cell(4),
        });
    }
    Ok(rows)
}

/// Blank → absent. Decimal commas are accepted.
fn parse_cell(row_no: usize, label: &str, raw: &str, code: &str) -> Result<Option<f64>, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let value = trimmed
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("row {row_no}: invalid {label} value '{trimmed}' for '{code}'"))?;
    if !(SCORE_MIN..=SCORE_MAX).contains(&value) {
        return Err(format!(
            "row {row_no}: {label} must be between 0 and 20 for '{code}'"
        ));
    }
    Ok(Some(value))
}

fn row_components(row: &ExchangeRow) -> Result<Components, String> {
    let code = row.matricule.as_str();
    Ok(Components::new(
        parse_cell(row.row_no, "CC", &row.cc, code)?,
        parse_cell(row.row_no, "TP", &row.tp, code)?,
        parse_cell(row.row_no, "SN", &row.sn, code)?,
    ))
}

/// Applies `rows` to `unit` in order; per-row failures land in `errors`.
pub fn import_grades(conn: &Connection, unit: &CourseUnit, rows: &[ExchangeRow]) -> ImportSummary {
    let mut summary = ImportSummary {
        batch_id: Uuid::new_v4().to_string(),
        imported: 0,
        updated: 0,
        errors: Vec::new(),
    };

    for row in rows {
        if row.name.is_empty() && row.matricule.is_empty() {
            continue;
        }
        let student = match catalog::find_student_by_matricule(conn, &row.matricule) {
            Ok(Some(s)) => s,
            Ok(None) => {
                summary
                    .errors
                    .push(format!("row {}: code '{}' not found", row.row_no, row.matricule));
                continue;
            }
            Err(e) => {
                summary.errors.push(format!("row {}: {}", row.row_no, e));
                continue;
            }
        };
        let components = match row_components(row) {
            Ok(c) => c,
            Err(message) => {
                summary.errors.push(message);
                continue;
            }
        };
        match grades::upsert_grade(conn, student.id, unit.id, components) {
            Ok(Upserted::Created) => summary.imported += 1,
            Ok(Upserted::Updated) => summary.updated += 1,
            Err(e) => summary.errors.push(format!("row {}: {}", row.row_no, e)),
        }
    }

    tracing::info!(
        batch_id = %summary.batch_id,
        course_unit = %unit.code,
        imported = summary.imported,
        updated = summary.updated,
        errors = summary.errors.len(),
        "grade import finished"
    );
    summary
}

fn cell(v: Option<f64>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

/// One row per student of `level_id`, ordered by name. Read-only.
pub fn export_grades<W: Write>(
    conn: &Connection,
    course_unit_id: i64,
    level_id: i64,
    writer: W,
) -> GradeResult<usize> {
    let mut stmt = conn.prepare(
        "SELECT s.name, s.matricule, g.cc, g.tp, g.sn
         FROM students s
         LEFT JOIN grades g ON g.student_id = s.id AND g.course_unit_id = ?1
         WHERE s.level_id = ?2
         ORDER BY s.name ASC, s.id ASC",
    )?;
    let rows = stmt
        .query_map((course_unit_id, level_id), |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, Option<f64>>(2)?,
                r.get::<_, Option<f64>>(3)?,
                r.get::<_, Option<f64>>(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(EXCHANGE_HEADER).map_err(csv_write_err)?;
    for (name, matricule, cc, tp, sn) in &rows {
        let record = [name.clone(), matricule.clone(), cell(*cc), cell(*tp), cell(*sn)];
        wtr.write_record(&record).map_err(csv_write_err)?;
    }
    wtr.flush()?;
    Ok(rows.len())
}

fn csv_write_err(e: csv::Error) -> GradeError {
    match e.into_kind() {
        csv::ErrorKind::Io(io) => GradeError::Io(io),
        other => GradeError::Io(std::io::Error::other(format!("{other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_rows_positionally_and_numbers_them_from_one() {
        let text = "Nom,Matricule,CC,TP,SN\nAlice,A001,12,14,\n,,,,\nBob,B002,9.5\n";
        let rows = read_rows(text.as_bytes(), 100).expect("rows");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].row_no, 1);
        assert_eq!(rows[0].matricule, "A001");
        assert_eq!(rows[0].sn, "");
        assert_eq!(rows[2].row_no, 3);
        assert_eq!(rows[2].cc, "9.5");
        assert_eq!(rows[2].tp, "");
    }

    #[test]
    fn blank_lines_still_count_towards_row_numbers() {
        let text = "Nom,Matricule,CC,TP,SN\nAlice,A001,1,2,3\n\nGhost,Z999,1,1,1\n";
        let rows = read_rows(text.as_bytes(), 100).expect("rows");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row_no, 1);
        assert_eq!(rows[1].matricule, "Z999");
        assert_eq!(rows[1].row_no, 3);
    }

    #[test]
    fn too_many_rows_is_rejected_before_anything_is_applied() {
        let text = "Nom,Matricule,CC,TP,SN\na,1,,,\nb,2,,,\nc,3,,,\n";
        let err = read_rows(text.as_bytes(), 2).expect_err("limit");
        assert_eq!(err.code(), "bad_params");
    }

    #[test]
    fn invalid_utf8_is_unreadable() {
        let bytes: &[u8] = b"Nom,Matricule,CC,TP,SN\n\xff\xfe,A1,1,2,3\n";
        let err = read_rows(bytes, 10).expect_err("bad bytes");
        assert_eq!(err.code(), "unreadable_input");
    }

    #[test]
    fn cell_parsing_distinguishes_parse_and_range_failures() {
        assert_eq!(parse_cell(1, "CC", "  ", "A1"), Ok(None));
        assert_eq!(parse_cell(1, "CC", "12,5", "A1"), Ok(Some(12.5)));
        assert_eq!(
            parse_cell(4, "TP", "abc", "A1"),
            Err("row 4: invalid TP value 'abc' for 'A1'".to_string())
        );
        assert_eq!(
            parse_cell(2, "SN", "21", "A1"),
            Err("row 2: SN must be between 0 and 20 for 'A1'".to_string())
        );
        assert!(parse_cell(2, "SN", "NaN", "A1").is_err());
    }

    #[test]
    fn blank_export_cells_for_missing_components() {
        assert_eq!(cell(None), "");
        assert_eq!(cell(Some(12.5)), "12.5");
        assert_eq!(cell(Some(10.0)), "10");
    }
}
