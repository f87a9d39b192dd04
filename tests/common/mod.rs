#![allow(dead_code)]

use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

pub struct Sidecar {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    next_id: u64,
}

impl Sidecar {
    pub fn spawn() -> Self {
        let exe = env!("CARGO_BIN_EXE_notesd");
        let mut child = Command::new(exe)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .env_remove("NOTESD_WORKSPACE")
            .spawn()
            .expect("spawn notesd");
        let stdin = child.stdin.take().expect("child stdin");
        let stdout = child.stdout.take().expect("child stdout");
        Self {
            child,
            stdin,
            reader: BufReader::new(stdout),
            next_id: 0,
        }
    }

    pub fn request(&mut self, method: &str, params: Value) -> Value {
        self.next_id += 1;
        let id = self.next_id.to_string();
        let payload = json!({
            "id": id,
            "method": method,
            "params": params,
        });
        writeln!(self.stdin, "{}", payload).expect("write request");
        self.stdin.flush().expect("flush request");

        let mut line = String::new();
        self.reader.read_line(&mut line).expect("read response line");
        assert!(!line.trim().is_empty(), "empty response for {}", method);
        let value: Value = serde_json::from_str(line.trim()).expect("parse response json");
        assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id.as_str()));
        value
    }

    /// Asserts success and returns `result`.
    pub fn ok(&mut self, method: &str, params: Value) -> Value {
        let value = self.request(method, params);
        assert!(
            value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
            "{} failed: {}",
            method,
            value
        );
        value.get("result").cloned().unwrap_or_else(|| json!({}))
    }

    /// Asserts failure and returns the error code.
    pub fn err_code(&mut self, method: &str, params: Value) -> String {
        let value = self.request(method, params);
        assert_eq!(
            value.get("ok").and_then(|v| v.as_bool()),
            Some(false),
            "{} unexpectedly succeeded: {}",
            method,
            value
        );
        value["error"]["code"]
            .as_str()
            .expect("error code")
            .to_string()
    }

    pub fn select_workspace(&mut self, path: &Path) {
        self.ok("workspace.select", json!({ "path": path.to_string_lossy() }));
    }

    pub fn login(&mut self, username: &str) {
        self.ok("session.login", json!({ "username": username }));
    }
}

impl Drop for Sidecar {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// A fresh workspace with a bootstrap superuser `admin`, logged in.
pub fn admin_session() -> (tempfile::TempDir, Sidecar) {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut sc = Sidecar::spawn();
    sc.select_workspace(dir.path());
    sc.ok("users.bootstrap", json!({ "username": "admin", "email": "admin@univ.test" }));
    sc.login("admin");
    (dir, sc)
}

pub fn id_of(v: &Value, key: &str) -> i64 {
    v[key]["id"].as_i64().unwrap_or_else(|| panic!("missing {key}.id in {v}"))
}

/// One department / program / level, as ids.
pub struct Scope {
    pub department: i64,
    pub program: i64,
    pub level: i64,
}

pub fn make_scope(sc: &mut Sidecar, dep: &str, program: &str, level: &str) -> Scope {
    let d = sc.ok("departments.create", json!({ "name": dep }));
    let department = id_of(&d, "department");
    let p = sc.ok(
        "programs.create",
        json!({ "name": program, "departmentId": department }),
    );
    let l = sc.ok("levels.create", json!({ "name": level }));
    Scope {
        department,
        program: id_of(&p, "program"),
        level: id_of(&l, "level"),
    }
}

pub fn make_unit(sc: &mut Sidecar, scope: &Scope, code: &str, credit: i64, semester: i64) -> i64 {
    let u = sc.ok(
        "courseUnits.create",
        json!({
            "code": code,
            "name": format!("Unit {code}"),
            "credit": credit,
            "programId": scope.program,
            "levelId": scope.level,
            "semester": semester
        }),
    );
    id_of(&u, "courseUnit")
}

pub fn make_student(sc: &mut Sidecar, scope: &Scope, name: &str, matricule: &str) -> i64 {
    let s = sc.ok(
        "students.create",
        json!({
            "name": name,
            "matricule": matricule,
            "programId": scope.program,
            "levelId": scope.level
        }),
    );
    id_of(&s, "student")
}

pub fn grade(sc: &mut Sidecar, student: i64, unit: i64, cc: Value, tp: Value, sn: Value) -> Value {
    sc.ok(
        "grades.create",
        json!({ "studentId": student, "courseUnitId": unit, "cc": cc, "tp": tp, "sn": sn }),
    )["grade"]
        .clone()
}
