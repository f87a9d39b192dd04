//! Who may touch what.
//!
//! Every grade write, grade-table `editable` flag and bulk exchange goes
//! through [`can_manage`]; structural edits go through [`can_administer`];
//! privilege changes go through [`check_staff_toggle`].

use crate::error::{GradeError, GradeResult};
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub user_id: i64,
    pub username: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

/// Superusers and staff manage every course unit; anyone else only the
/// units whose instructor set contains them.
pub fn can_manage(actor: &Actor, instructor_ids: &[i64]) -> bool {
    actor.is_superuser || actor.is_staff || instructor_ids.contains(&actor.user_id)
}

pub fn can_administer(actor: &Actor) -> bool {
    actor.is_superuser || actor.is_staff
}

/// A refused privilege change. Reported to the user, not raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivilegeDenied {
    pub message: &'static str,
}

pub fn check_staff_toggle(actor: &Actor, target: &Actor) -> Result<(), PrivilegeDenied> {
    if !actor.is_superuser {
        return Err(PrivilegeDenied {
            message: "Seul le superuser peut modifier le statut staff.",
        });
    }
    if actor.user_id == target.user_id {
        return Err(PrivilegeDenied {
            message: "Vous ne pouvez pas modifier votre propre statut.",
        });
    }
    if target.is_superuser {
        return Err(PrivilegeDenied {
            message: "Vous ne pouvez pas modifier le statut d'un superuser.",
        });
    }
    Ok(())
}

pub fn load_actor(conn: &Connection, user_id: i64) -> GradeResult<Option<Actor>> {
    let actor = conn
        .query_row(
            "SELECT id, username, is_staff, is_superuser FROM users WHERE id = ?",
            [user_id],
            |r| {
                Ok(Actor {
                    user_id: r.get(0)?,
                    username: r.get(1)?,
                    is_staff: r.get::<_, i64>(2)? != 0,
                    is_superuser: r.get::<_, i64>(3)? != 0,
                })
            },
        )
        .optional()?;
    Ok(actor)
}

pub fn instructor_ids(conn: &Connection, course_unit_id: i64) -> GradeResult<Vec<i64>> {
    let mut stmt = conn.prepare(
        "SELECT user_id FROM course_unit_instructors WHERE course_unit_id = ? ORDER BY user_id",
    )?;
    let ids = stmt
        .query_map([course_unit_id], |r| r.get::<_, i64>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

/// Loads the unit's instructor set and applies [`can_manage`], turning a
/// refusal into `Forbidden`.
pub fn require_manage(conn: &Connection, actor: &Actor, course_unit_id: i64) -> GradeResult<()> {
    if can_administer(actor) {
        return Ok(());
    }
    let instructors = instructor_ids(conn, course_unit_id)?;
    if can_manage(actor, &instructors) {
        Ok(())
    } else {
        Err(GradeError::Forbidden(
            "you do not manage this course unit".to_string(),
        ))
    }
}

pub fn require_administer(actor: &Actor) -> GradeResult<()> {
    if can_administer(actor) {
        Ok(())
    } else {
        Err(GradeError::Forbidden("staff privileges required".to_string()))
    }
}
