use crate::access::require_administer;
use crate::db;
use crate::directory::{DEFAULT_BROWSE_PAGE_SIZE, DEFAULT_TABLE_PAGE_SIZE};
use crate::error::{GradeError, GradeResult};
use crate::exchange::DEFAULT_MAX_ROWS;
use crate::ipc::error::reply;
use crate::ipc::helpers::{current_actor, require_db};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::{json, Map, Value};

#[derive(Clone, Copy)]
enum SetupSection {
    Directory,
    GradeTable,
    Exchange,
}

impl SetupSection {
    const ALL: [SetupSection; 3] = [Self::Directory, Self::GradeTable, Self::Exchange];

    fn parse(s: &str) -> Option<Self> {
        match s {
            "directory" => Some(Self::Directory),
            "gradeTable" => Some(Self::GradeTable),
            "exchange" => Some(Self::Exchange),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Directory => "directory",
            Self::GradeTable => "gradeTable",
            Self::Exchange => "exchange",
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Directory => "setup.directory",
            Self::GradeTable => "setup.gradeTable",
            Self::Exchange => "setup.exchange",
        }
    }
}

fn default_section(section: SetupSection) -> Value {
    match section {
        SetupSection::Directory => json!({ "pageSize": DEFAULT_BROWSE_PAGE_SIZE }),
        SetupSection::GradeTable => json!({ "pageSize": DEFAULT_TABLE_PAGE_SIZE }),
        SetupSection::Exchange => json!({ "maxRows": DEFAULT_MAX_ROWS }),
    }
}

fn parse_i64_range(v: &Value, key: &str, min: i64, max: i64) -> Result<i64, String> {
    let n = v
        .as_i64()
        .ok_or_else(|| format!("{} must be integer", key))?;
    if !(min..=max).contains(&n) {
        return Err(format!("{} must be in {}..={}", key, min, max));
    }
    Ok(n)
}

fn merge_section_patch(
    section: SetupSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    let obj = current
        .as_object_mut()
        .ok_or_else(|| "internal setup object must be a JSON object".to_string())?;
    for (k, v) in patch {
        match (section, k.as_str()) {
            (SetupSection::Directory | SetupSection::GradeTable, "pageSize") => {
                obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 1, 500)?));
            }
            (SetupSection::Exchange, "maxRows") => {
                obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 1, 100_000)?));
            }
            _ => return Err(format!("unknown {} field: {}", section.name(), k)),
        }
    }
    Ok(())
}

fn load_section(conn: &Connection, section: SetupSection) -> GradeResult<Value> {
    let mut current = default_section(section);
    if let Some(saved) = db::settings_get_json(conn, section.key())? {
        if let Some(saved_obj) = saved.as_object() {
            // Malformed stored values keep the defaults.
            let _ = merge_section_patch(section, &mut current, saved_obj);
        }
    }
    Ok(current)
}

fn section_i64(conn: &Connection, section: SetupSection, field: &str, fallback: i64) -> GradeResult<i64> {
    Ok(load_section(conn, section)?
        .get(field)
        .and_then(|v| v.as_i64())
        .unwrap_or(fallback))
}

pub(crate) fn directory_page_size(conn: &Connection) -> GradeResult<i64> {
    section_i64(conn, SetupSection::Directory, "pageSize", DEFAULT_BROWSE_PAGE_SIZE)
}

pub(crate) fn grade_table_page_size(conn: &Connection) -> GradeResult<i64> {
    section_i64(conn, SetupSection::GradeTable, "pageSize", DEFAULT_TABLE_PAGE_SIZE)
}

pub(crate) fn exchange_max_rows(conn: &Connection) -> GradeResult<usize> {
    let n = section_i64(conn, SetupSection::Exchange, "maxRows", DEFAULT_MAX_ROWS as i64)?;
    Ok(usize::try_from(n).unwrap_or(DEFAULT_MAX_ROWS))
}

fn handle_setup_get(state: &mut AppState, _req: &Request) -> GradeResult<Value> {
    let conn = require_db(state)?;
    let mut out = Map::new();
    for section in SetupSection::ALL {
        out.insert(section.name().to_string(), load_section(conn, section)?);
    }
    Ok(Value::Object(out))
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> GradeResult<Value> {
    let conn = require_db(state)?;
    let actor = current_actor(state, conn)?;
    require_administer(&actor)?;
    let section_raw = req
        .params
        .get("section")
        .and_then(|v| v.as_str())
        .ok_or_else(|| GradeError::validation("missing section"))?;
    let section = SetupSection::parse(section_raw)
        .ok_or_else(|| GradeError::validation("unknown section"))?;
    let patch_obj = req
        .params
        .get("patch")
        .and_then(|v| v.as_object())
        .ok_or_else(|| GradeError::validation("patch must be an object"))?;

    let mut current = load_section(conn, section)?;
    merge_section_patch(section, &mut current, patch_obj).map_err(GradeError::Validation)?;
    db::settings_set_json(conn, section.key(), &current)?;
    Ok(json!({ "ok": true, section.name(): current }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let outcome = match req.method.as_str() {
        "setup.get" => handle_setup_get(state, req),
        "setup.update" => handle_setup_update(state, req),
        _ => return None,
    };
    Some(reply(&req.id, &req.method, outcome))
}
