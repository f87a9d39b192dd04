use crate::access::{self, check_staff_toggle, require_administer, Actor};
use crate::error::{is_unique_violation, GradeError, GradeResult};
use crate::ipc::error::reply;
use crate::ipc::helpers::{current_actor, get_id, get_str, opt_bool, opt_str, require_db};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;

const USERS_LIST_ROUTE: &str = "users.list";

fn insert_user(
    conn: &Connection,
    username: &str,
    email: &str,
    is_staff: bool,
    is_superuser: bool,
) -> GradeResult<Actor> {
    conn.execute(
        "INSERT INTO users(username, email, is_staff, is_superuser, created_at)
         VALUES(?, ?, ?, ?, ?)",
        (
            username,
            email,
            is_staff as i64,
            is_superuser as i64,
            chrono::Utc::now().to_rfc3339(),
        ),
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            GradeError::Conflict("username already exists".to_string())
        } else {
            e.into()
        }
    })?;
    access::load_actor(conn, conn.last_insert_rowid())?.ok_or(GradeError::NotFound("user"))
}

/// Creates the first account as superuser. Refused once any account exists.
fn handle_bootstrap(state: &mut AppState, req: &Request) -> GradeResult<serde_json::Value> {
    let conn = require_db(state)?;
    let username = get_str(&req.params, "username")?;
    let email = opt_str(&req.params, "email").unwrap_or_default();
    let existing: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;
    if existing > 0 {
        return Err(GradeError::Conflict(
            "accounts already exist; bootstrap is only allowed on an empty workspace".to_string(),
        ));
    }
    let user = insert_user(conn, &username, &email, true, true)?;
    tracing::info!(user = %user.username, "bootstrap superuser created");
    Ok(json!({ "user": user }))
}

fn handle_list(state: &mut AppState, _req: &Request) -> GradeResult<serde_json::Value> {
    let conn = require_db(state)?;
    let actor = current_actor(state, conn)?;
    require_administer(&actor)?;
    let mut stmt = conn.prepare(
        "SELECT id, username, email, is_staff, is_superuser FROM users ORDER BY username",
    )?;
    let users = stmt
        .query_map([], |r| {
            Ok(json!({
                "id": r.get::<_, i64>(0)?,
                "username": r.get::<_, String>(1)?,
                "email": r.get::<_, String>(2)?,
                "isStaff": r.get::<_, i64>(3)? != 0,
                "isSuperuser": r.get::<_, i64>(4)? != 0,
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(json!({ "users": users }))
}

/// Adds an instructor account; staff by default, matching how instructors
/// are registered.
fn handle_create(state: &mut AppState, req: &Request) -> GradeResult<serde_json::Value> {
    let conn = require_db(state)?;
    let actor = current_actor(state, conn)?;
    require_administer(&actor)?;
    let username = get_str(&req.params, "username")?;
    let email = opt_str(&req.params, "email").unwrap_or_default();
    let is_staff = opt_bool(&req.params, "isStaff")?.unwrap_or(true);
    let user = insert_user(conn, &username, &email, is_staff, false)?;
    Ok(json!({ "user": user }))
}

/// Interactive operation: refusals come back as a successful response with
/// a redirect and an error message.
fn handle_toggle_staff(state: &mut AppState, req: &Request) -> GradeResult<serde_json::Value> {
    let conn = require_db(state)?;
    let actor = current_actor(state, conn)?;
    require_administer(&actor)?;
    let target_id = get_id(&req.params, "userId")?;
    let target = access::load_actor(conn, target_id)?.ok_or(GradeError::NotFound("user"))?;

    if let Err(denied) = check_staff_toggle(&actor, &target) {
        return Ok(json!({
            "applied": false,
            "redirect": USERS_LIST_ROUTE,
            "isStaff": target.is_staff,
            "messages": [{ "level": "error", "text": denied.message }]
        }));
    }

    let now_staff = !target.is_staff;
    conn.execute(
        "UPDATE users SET is_staff = ? WHERE id = ?",
        (now_staff as i64, target.user_id),
    )?;
    let verb = if now_staff { "Promu" } else { "Rétrogradé" };
    let text = format!("{verb} {}.", target.username);
    tracing::info!(by = %actor.username, target = %target.username, is_staff = now_staff, "staff flag toggled");
    Ok(json!({
        "applied": true,
        "redirect": USERS_LIST_ROUTE,
        "isStaff": now_staff,
        "messages": [{ "level": "success", "text": text }]
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let outcome = match req.method.as_str() {
        "users.bootstrap" => handle_bootstrap(state, req),
        "users.list" => handle_list(state, req),
        "users.create" => handle_create(state, req),
        "users.toggleStaff" => handle_toggle_staff(state, req),
        _ => return None,
    };
    Some(reply(&req.id, &req.method, outcome))
}
