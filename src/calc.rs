use crate::error::{GradeError, GradeResult};
use serde::Serialize;
use std::collections::HashMap;

pub const SCORE_MIN: f64 = 0.0;
pub const SCORE_MAX: f64 = 20.0;

/// Fixed 2-decimal rounding used for finals and averages:
/// half away from zero, `round(100*x) / 100`.
///
/// SQLite's `ROUND(x, 2)` follows the same rule, so SQL-side sorting and
/// Rust-side display agree.
pub fn round_off_2_decimals(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn to_hundredths(x: f64) -> i64 {
    (x * 100.0).round() as i64
}

/// Per-course-unit component weights, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Weights {
    pub cc: u32,
    pub tp: u32,
    pub sn: u32,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            cc: 20,
            tp: 30,
            sn: 50,
        }
    }
}

impl Weights {
    /// The only way to build weights that will be persisted: the triple must
    /// sum to exactly 100. Invalid triples are rejected, never normalized.
    pub fn validate(cc: u32, tp: u32, sn: u32) -> GradeResult<Self> {
        let total = u64::from(cc) + u64::from(tp) + u64::from(sn);
        if total != 100 {
            return Err(GradeError::validation(format!(
                "CC/TP/SN weights must sum to 100 (got {cc}+{tp}+{sn}={total})"
            )));
        }
        Ok(Self { cc, tp, sn })
    }
}

/// The three component scores of one grade. Always read and written together.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Components {
    pub cc: Option<f64>,
    pub tp: Option<f64>,
    pub sn: Option<f64>,
}

impl Components {
    pub fn new(cc: Option<f64>, tp: Option<f64>, sn: Option<f64>) -> Self {
        Self { cc, tp, sn }
    }

    /// Validates each present component; the first failure wins.
    pub fn validated(cc: Option<f64>, tp: Option<f64>, sn: Option<f64>) -> GradeResult<Self> {
        Ok(Self {
            cc: validate_component("CC", cc)?,
            tp: validate_component("TP", tp)?,
            sn: validate_component("SN", sn)?,
        })
    }
}

pub fn validate_component(label: &str, value: Option<f64>) -> GradeResult<Option<f64>> {
    match value {
        None => Ok(None),
        Some(v) if v.is_finite() && (SCORE_MIN..=SCORE_MAX).contains(&v) => Ok(Some(v)),
        Some(v) => Err(GradeError::validation(format!(
            "{label} must be between 0 and 20 or null (got {v})"
        ))),
    }
}

/// Eliminated ("Éliminé") when any component is missing.
pub fn is_eliminated(c: &Components) -> bool {
    c.cc.is_none() || c.tp.is_none() || c.sn.is_none()
}

pub fn compute_final(c: &Components, w: Weights) -> Option<f64> {
    let (Some(cc), Some(tp), Some(sn)) = (c.cc, c.tp, c.sn) else {
        return None;
    };
    let total = cc * f64::from(w.cc) / 100.0
        + tp * f64::from(w.tp) / 100.0
        + sn * f64::from(w.sn) / 100.0;
    Some(round_off_2_decimals(total))
}

/// Credit-weighted mean over `(final, credit)` pairs.
///
/// Entries without a final are ignored. Finals are summed as integer
/// hundredths so the result does not depend on iteration order. Returns
/// `None` when nothing qualifies or the qualifying credits do not sum to a
/// positive total.
pub fn transcript_average<I>(entries: I) -> Option<f64>
where
    I: IntoIterator<Item = (Option<f64>, i64)>,
{
    let mut weighted: i128 = 0;
    let mut credits: i128 = 0;
    let mut qualifying = 0usize;
    for (final_mark, credit) in entries {
        let Some(f) = final_mark else {
            continue;
        };
        qualifying += 1;
        weighted += i128::from(to_hundredths(f)) * i128::from(credit);
        credits += i128::from(credit);
    }
    if qualifying == 0 || credits <= 0 {
        return None;
    }
    let mean_hundredths = weighted as f64 / credits as f64;
    Some(mean_hundredths.round() / 100.0)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseUnitTerms {
    pub credit: i64,
    pub weights: Weights,
}

#[derive(Debug, Clone, Copy)]
pub struct GradeRecord {
    pub course_unit_id: i64,
    pub components: Components,
}

/// Rolls a student's grades up into one average, resolving each grade's
/// weights and credit through `course_units` at call time. Grades whose
/// course unit is absent from the map are skipped.
pub fn aggregate(grades: &[GradeRecord], course_units: &HashMap<i64, CourseUnitTerms>) -> Option<f64> {
    transcript_average(grades.iter().filter_map(|g| {
        let terms = course_units.get(&g.course_unit_id)?;
        Some((compute_final(&g.components, terms.weights), terms.credit))
    }))
}
