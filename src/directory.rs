//! Students × course units × grades, scoped by the department → program →
//! level → semester → unit cascade. Every query is filtered by the
//! resolved scope before rows are materialized.

use crate::access::{can_manage, Actor};
use crate::calc::{Components, Weights};
use crate::catalog::{self, CourseUnit, NamedOption};
use crate::error::GradeResult;
use crate::grades::GradeView;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

pub const DEFAULT_BROWSE_PAGE_SIZE: i64 = 20;
pub const DEFAULT_TABLE_PAGE_SIZE: i64 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paging {
    pub page: i64,
    pub page_size: i64,
    pub num_pages: i64,
    pub total: i64,
}

impl Paging {
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }
}

/// 1-indexed pagination. Pages below 1 resolve to 1; pages past the end
/// resolve to the last page. An empty set has one (empty) page.
pub fn paginate(total: i64, requested_page: i64, page_size: i64) -> Paging {
    let page_size = page_size.max(1);
    let total = total.max(0);
    let num_pages = if total == 0 {
        0
    } else {
        (total + page_size - 1) / page_size
    };
    let page = requested_page.clamp(1, num_pages.max(1));
    Paging {
        page,
        page_size,
        num_pages,
        total,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    Name,
    Matricule,
    /// Descending final for the selected unit; only honored when a unit
    /// is selected.
    Final,
}

impl SortKey {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("matricule") | Some("enrollment-code") => Self::Matricule,
            Some("final") | Some("note") | Some("final-descending") => Self::Final,
            _ => Self::Name,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BrowseQuery {
    pub department_id: Option<i64>,
    pub program_id: Option<i64>,
    pub level_id: Option<i64>,
    pub semester: Option<i64>,
    pub course_unit_id: Option<i64>,
    pub sort: Option<String>,
    pub page: i64,
    pub page_size: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseUnitOption {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub credit: i64,
}

impl From<&CourseUnit> for CourseUnitOption {
    fn from(u: &CourseUnit) -> Self {
        Self {
            id: u.id,
            code: u.code.clone(),
            name: u.name.clone(),
            credit: u.credit,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedScope {
    pub department_id: Option<i64>,
    pub program_id: Option<i64>,
    pub level_id: Option<i64>,
    pub semester: i64,
    pub course_unit_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeOptions {
    pub departments: Vec<NamedOption>,
    pub programs: Vec<NamedOption>,
    pub levels: Vec<NamedOption>,
    pub course_units: Vec<CourseUnitOption>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub id: i64,
    pub name: String,
    pub matricule: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseRow {
    pub student: StudentSummary,
    pub grade: Option<GradeView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseModel {
    pub options: ScopeOptions,
    pub selected: ResolvedScope,
    pub sort: SortKey,
    pub paging: Paging,
    pub rows: Vec<BrowseRow>,
}

/// Requested id if it is among `options`, otherwise the first option.
fn pick(options: &[NamedOption], requested: Option<i64>) -> Option<i64> {
    requested
        .and_then(|id| options.iter().find(|o| o.id == id).map(|o| o.id))
        .or_else(|| options.first().map(|o| o.id))
}

fn normalize_semester(raw: Option<i64>) -> i64 {
    match raw {
        Some(2) => 2,
        _ => 1,
    }
}

pub fn resolve_scope(conn: &Connection, q: &BrowseQuery) -> GradeResult<(ResolvedScope, ScopeOptions, Option<CourseUnit>)> {
    let departments = catalog::list_departments(conn)?;
    let department_id = pick(&departments, q.department_id);

    let programs = catalog::list_programs(conn, department_id)?;
    let program_id = pick(&programs, q.program_id);

    let levels = catalog::list_levels(conn, program_id)?;
    let level_id = pick(&levels, q.level_id);

    let semester = normalize_semester(q.semester);

    let units = match (program_id, level_id) {
        (Some(p), Some(l)) => catalog::list_course_units(conn, Some(p), Some(l), Some(semester))?,
        _ => Vec::new(),
    };
    let selected_unit = q
        .course_unit_id
        .and_then(|id| units.iter().find(|u| u.id == id).cloned());

    Ok((
        ResolvedScope {
            department_id,
            program_id,
            level_id,
            semester,
            course_unit_id: selected_unit.as_ref().map(|u| u.id),
        },
        ScopeOptions {
            departments,
            programs,
            levels,
            course_units: units.iter().map(CourseUnitOption::from).collect(),
        },
        selected_unit,
    ))
}

/// Final mark of `g` under weights `?4`/`?5`/`?6`, with the same float
/// operations as `calc::compute_final`. SQLite `ROUND(x)` rounds half away
/// from zero, but `ROUND(x, 2)` rounds the exact binary value, which can
/// differ from the displayed final.
const FINAL_MARK_SQL: &str =
    "ROUND((g.cc * ?4 / 100.0 + g.tp * ?5 / 100.0 + g.sn * ?6 / 100.0) * 100.0) / 100.0";

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(",")
}

fn summary_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<StudentSummary> {
    Ok(StudentSummary {
        id: r.get(0)?,
        name: r.get(1)?,
        matricule: r.get(2)?,
    })
}

fn page_of_students(
    conn: &Connection,
    program_id: i64,
    level_id: i64,
    sort: SortKey,
    unit: Option<&CourseUnit>,
    paging: &Paging,
) -> GradeResult<Vec<StudentSummary>> {
    let rows = match (sort, unit) {
        (SortKey::Final, Some(u)) => {
            let sql = format!(
                "SELECT s.id, s.name, s.matricule
                 FROM students s
                 LEFT JOIN grades g ON g.student_id = s.id AND g.course_unit_id = ?1
                 WHERE s.program_id = ?2 AND s.level_id = ?3
                 ORDER BY COALESCE({FINAL_MARK_SQL}, -1.0) DESC,
                          s.name ASC,
                          s.id ASC
                 LIMIT ?7 OFFSET ?8"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    (
                        u.id,
                        program_id,
                        level_id,
                        u.weights.cc,
                        u.weights.tp,
                        u.weights.sn,
                        paging.page_size,
                        paging.offset(),
                    ),
                    summary_from_row,
                )?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
        _ => {
            let order = if sort == SortKey::Matricule {
                "s.matricule ASC, s.id ASC"
            } else {
                "s.name ASC, s.id ASC"
            };
            let sql = format!(
                "SELECT s.id, s.name, s.matricule
                 FROM students s
                 WHERE s.program_id = ? AND s.level_id = ?
                 ORDER BY {}
                 LIMIT ? OFFSET ?",
                order
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    (program_id, level_id, paging.page_size, paging.offset()),
                    summary_from_row,
                )?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
    };
    Ok(rows)
}

/// Grades of `student_ids` for `units`, keyed by (student, unit).
fn grades_for(
    conn: &Connection,
    student_ids: &[i64],
    units: &[CourseUnit],
) -> GradeResult<HashMap<(i64, i64), GradeView>> {
    let mut out = HashMap::new();
    if student_ids.is_empty() || units.is_empty() {
        return Ok(out);
    }
    let weights: HashMap<i64, Weights> = units.iter().map(|u| (u.id, u.weights)).collect();
    let sql = format!(
        "SELECT id, student_id, course_unit_id, cc, tp, sn
         FROM grades
         WHERE student_id IN ({}) AND course_unit_id IN ({})",
        placeholders(student_ids.len()),
        placeholders(units.len())
    );
    let mut bind_values: Vec<Value> = Vec::with_capacity(student_ids.len() + units.len());
    for id in student_ids {
        bind_values.push(Value::Integer(*id));
    }
    for u in units {
        bind_values.push(Value::Integer(u.id));
    }
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(bind_values), |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, i64>(1)?,
            r.get::<_, i64>(2)?,
            Components::new(r.get(3)?, r.get(4)?, r.get(5)?),
        ))
    })?;
    for row in rows {
        let (grade_id, student_id, unit_id, components) = row?;
        let Some(w) = weights.get(&unit_id) else {
            continue;
        };
        out.insert(
            (student_id, unit_id),
            GradeView::derive(grade_id, student_id, unit_id, components, *w),
        );
    }
    Ok(out)
}

/// The browsing view: cascading defaults, optional unit column, sort and
/// page clamping.
pub fn browse(conn: &Connection, q: &BrowseQuery) -> GradeResult<BrowseModel> {
    let (selected, options, unit) = resolve_scope(conn, q)?;
    let mut sort = SortKey::parse(q.sort.as_deref());
    if sort == SortKey::Final && unit.is_none() {
        sort = SortKey::Name;
    }

    let (Some(program_id), Some(level_id)) = (selected.program_id, selected.level_id) else {
        return Ok(BrowseModel {
            options,
            selected,
            sort,
            paging: paginate(0, q.page, q.page_size),
            rows: Vec::new(),
        });
    };

    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM students WHERE program_id = ? AND level_id = ?",
        (program_id, level_id),
        |r| r.get(0),
    )?;
    let paging = paginate(total, q.page, q.page_size);
    let students = page_of_students(conn, program_id, level_id, sort, unit.as_ref(), &paging)?;

    let mut grades = match &unit {
        Some(u) => {
            let ids: Vec<i64> = students.iter().map(|s| s.id).collect();
            grades_for(conn, &ids, std::slice::from_ref(u))?
        }
        None => HashMap::new(),
    };
    let unit_id = unit.as_ref().map(|u| u.id);
    let rows = students
        .into_iter()
        .map(|s| {
            let grade = unit_id.and_then(|uid| grades.remove(&(s.id, uid)));
            BrowseRow { student: s, grade }
        })
        .collect();

    Ok(BrowseModel {
        options,
        selected,
        sort,
        paging,
        rows,
    })
}

#[derive(Debug, Clone, Default)]
pub struct TableQuery {
    pub department_id: Option<i64>,
    pub program_id: Option<i64>,
    pub level_id: Option<i64>,
    pub page: i64,
    pub page_size: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableUnit {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub credit: i64,
    pub editable: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    pub id: i64,
    pub name: String,
    pub matricule: String,
    /// Keyed by course unit id; `null` where no grade exists yet.
    pub grades: BTreeMap<String, Option<GradeView>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeTableModel {
    pub course_units: Vec<TableUnit>,
    pub students: Vec<TableRow>,
    pub paging: Paging,
}

fn instructors_by_unit(conn: &Connection, units: &[CourseUnit]) -> GradeResult<HashMap<i64, Vec<i64>>> {
    let mut out: HashMap<i64, Vec<i64>> = HashMap::new();
    if units.is_empty() {
        return Ok(out);
    }
    let sql = format!(
        "SELECT course_unit_id, user_id FROM course_unit_instructors WHERE course_unit_id IN ({})",
        placeholders(units.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(units.iter().map(|u| u.id)), |r| {
        Ok((r.get::<_, i64>(0)?, r.get::<_, i64>(1)?))
    })?;
    for row in rows {
        let (unit_id, user_id) = row?;
        out.entry(unit_id).or_default().push(user_id);
    }
    Ok(out)
}

/// The editing grid: plain (non-defaulting) filters, every matching unit
/// flagged with whether `actor` may edit it.
pub fn grade_table(conn: &Connection, actor: &Actor, q: &TableQuery) -> GradeResult<GradeTableModel> {
    let unit_sql = format!(
        "SELECT {} FROM course_units cu
         LEFT JOIN programs p ON p.id = cu.program_id
         WHERE (?1 IS NULL OR p.department_id = ?1)
           AND (?2 IS NULL OR cu.program_id = ?2)
           AND (?3 IS NULL OR cu.level_id = ?3)
         ORDER BY cu.code",
        catalog::COURSE_UNIT_COLUMNS
    );
    let mut stmt = conn.prepare(&unit_sql)?;
    let units = stmt
        .query_map(
            (q.department_id, q.program_id, q.level_id),
            catalog::course_unit_from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    let instructors = instructors_by_unit(conn, &units)?;
    let table_units: Vec<TableUnit> = units
        .iter()
        .map(|u| TableUnit {
            id: u.id,
            code: u.code.clone(),
            name: u.name.clone(),
            credit: u.credit,
            editable: can_manage(
                actor,
                instructors.get(&u.id).map(Vec::as_slice).unwrap_or(&[]),
            ),
        })
        .collect();

    let student_filter = "FROM students s
         LEFT JOIN programs p ON p.id = s.program_id
         WHERE (?1 IS NULL OR p.department_id = ?1)
           AND (?2 IS NULL OR s.program_id = ?2)
           AND (?3 IS NULL OR s.level_id = ?3)";
    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) {}", student_filter),
        (q.department_id, q.program_id, q.level_id),
        |r| r.get(0),
    )?;
    let paging = paginate(total, q.page, q.page_size);

    let mut stmt = conn.prepare(&format!(
        "SELECT s.id, s.name, s.matricule {} ORDER BY s.name ASC, s.id ASC LIMIT ?4 OFFSET ?5",
        student_filter
    ))?;
    let students = stmt
        .query_map(
            (
                q.department_id,
                q.program_id,
                q.level_id,
                paging.page_size,
                paging.offset(),
            ),
            summary_from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    let ids: Vec<i64> = students.iter().map(|s| s.id).collect();
    let mut grades = grades_for(conn, &ids, &units)?;
    let rows = students
        .into_iter()
        .map(|s| {
            let cells = units
                .iter()
                .map(|u| (u.id.to_string(), grades.remove(&(s.id, u.id))))
                .collect();
            TableRow {
                id: s.id,
                name: s.name,
                matricule: s.matricule,
                grades: cells,
            }
        })
        .collect();

    Ok(GradeTableModel {
        course_units: table_units,
        students: rows,
        paging,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_past_the_end_returns_last_page() {
        let p = paginate(45, 9, 20);
        assert_eq!(p.page, 3);
        assert_eq!(p.num_pages, 3);
        assert_eq!(p.offset(), 40);
    }

    #[test]
    fn page_below_one_and_empty_sets_resolve_to_first_page() {
        assert_eq!(paginate(45, 0, 20).page, 1);
        assert_eq!(paginate(45, -3, 20).page, 1);
        let empty = paginate(0, 5, 20);
        assert_eq!(empty.page, 1);
        assert_eq!(empty.num_pages, 0);
        assert_eq!(empty.offset(), 0);
    }

    #[test]
    fn exact_multiple_has_no_trailing_page() {
        let p = paginate(40, 3, 20);
        assert_eq!(p.num_pages, 2);
        assert_eq!(p.page, 2);
    }

    #[test]
    fn sort_key_accepts_aliases_and_defaults_to_name() {
        assert_eq!(SortKey::parse(None), SortKey::Name);
        assert_eq!(SortKey::parse(Some("bogus")), SortKey::Name);
        assert_eq!(SortKey::parse(Some("matricule")), SortKey::Matricule);
        assert_eq!(SortKey::parse(Some("enrollment-code")), SortKey::Matricule);
        assert_eq!(SortKey::parse(Some("note")), SortKey::Final);
        assert_eq!(SortKey::parse(Some("Final")), SortKey::Final);
    }

    #[test]
    fn pick_falls_back_to_first_option() {
        let opts = vec![
            NamedOption {
                id: 4,
                name: "a".into(),
            },
            NamedOption {
                id: 9,
                name: "b".into(),
            },
        ];
        assert_eq!(pick(&opts, Some(9)), Some(9));
        assert_eq!(pick(&opts, Some(77)), Some(4));
        assert_eq!(pick(&opts, None), Some(4));
        assert_eq!(pick(&[], Some(1)), None);
    }

    #[test]
    fn sql_final_mark_matches_computed_final() {
        use crate::calc::{compute_final, Components, Weights};

        let conn = Connection::open_in_memory().expect("in-memory db");
        conn.execute_batch("CREATE TABLE grades(cc REAL, tp REAL, sn REAL);")
            .expect("table");
        let sql = format!(
            "SELECT {FINAL_MARK_SQL}, ?1, ?2, ?3 FROM grades g"
        );
        let marks = [0.25, 10.25, 12.25, 13.06, 7.35, 14.45, 9.15, 18.05, 3.33, 11.11];
        let weights = [(20, 30, 50), (33, 33, 34), (0, 0, 100), (25, 25, 50)];
        for &(wcc, wtp, wsn) in &weights {
            let w = Weights::validate(wcc, wtp, wsn).expect("weights");
            for &cc in &marks {
                for &tp in &marks {
                    for &sn in &marks {
                        conn.execute("DELETE FROM grades", []).expect("clear");
                        conn.execute("INSERT INTO grades VALUES(?, ?, ?)", (cc, tp, sn))
                            .expect("insert");
                        let from_sql: f64 = conn
                            .query_row(&sql, (0, 0, 0, wcc, wtp, wsn), |r| r.get(0))
                            .expect("select");
                        let expected = compute_final(
                            &Components { cc: Some(cc), tp: Some(tp), sn: Some(sn) },
                            w,
                        );
                        assert_eq!(Some(from_sql), expected, "{cc}/{tp}/{sn} at {wcc}/{wtp}/{wsn}");
                    }
                }
            }
        }
    }

    #[test]
    fn semester_outside_one_or_two_becomes_one() {
        assert_eq!(normalize_semester(Some(2)), 2);
        assert_eq!(normalize_semester(Some(3)), 1);
        assert_eq!(normalize_semester(None), 1);
    }
}
