mod common;

use common::{admin_session, grade, id_of, make_scope, make_student, make_unit};
use serde_json::{json, Value};

fn names(model: &Value) -> Vec<String> {
    model["rows"]
        .as_array()
        .expect("rows")
        .iter()
        .map(|r| r["student"]["name"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[test]
fn browse_defaults_cascade_to_first_options() {
    let (_dir, mut sc) = admin_session();
    let info = make_scope(&mut sc, "Informatique", "GL", "L2");
    let _maths = make_scope(&mut sc, "Mathematiques", "MA", "L3");
    let s1 = make_unit(&mut sc, &info, "INF201", 6, 1);
    let _s2 = make_unit(&mut sc, &info, "INF251", 4, 2);
    make_student(&mut sc, &info, "Alice", "A001");

    let model = sc.ok("directory.browse", json!({}));
    assert_eq!(model["selected"]["departmentId"], json!(info.department));
    assert_eq!(model["selected"]["programId"], json!(info.program));
    assert_eq!(model["selected"]["levelId"], json!(info.level));
    assert_eq!(model["selected"]["semester"], json!(1));
    assert!(model["selected"]["courseUnitId"].is_null());
    assert_eq!(model["options"]["departments"].as_array().map(Vec::len), Some(2));
    let units = model["options"]["courseUnits"].as_array().expect("units");
    assert_eq!(units.len(), 1);
    assert_eq!(units[0]["id"], json!(s1));
    assert_eq!(names(&model), vec!["Alice"]);
    assert!(model["rows"][0]["grade"].is_null());

    // Unknown ids fall back to the first option; a bad semester becomes 1.
    let model = sc.ok(
        "directory.browse",
        json!({ "departmentId": 999, "programId": 999, "semester": 7 }),
    );
    assert_eq!(model["selected"]["departmentId"], json!(info.department));
    assert_eq!(model["selected"]["semester"], json!(1));
}

#[test]
fn levels_offered_are_those_with_students_in_the_program() {
    let (_dir, mut sc) = admin_session();
    let info = make_scope(&mut sc, "Informatique", "GL", "L2");
    let empty_level = id_of(&sc.ok("levels.create", json!({ "name": "M1" })), "level");
    make_student(&mut sc, &info, "Alice", "A001");

    let levels = sc.ok("levels.list", json!({ "programId": info.program }));
    let ids: Vec<i64> = levels["levels"]
        .as_array()
        .expect("levels")
        .iter()
        .filter_map(|l| l["id"].as_i64())
        .collect();
    assert_eq!(ids, vec![info.level]);

    let all = sc.ok("levels.list", json!({}));
    assert_eq!(all["levels"].as_array().map(Vec::len), Some(2));
    assert!(all["levels"]
        .as_array()
        .expect("levels")
        .iter()
        .any(|l| l["id"] == json!(empty_level)));
}

#[test]
fn sort_by_final_puts_ungraded_and_eliminated_last() {
    let (_dir, mut sc) = admin_session();
    let scope = make_scope(&mut sc, "Informatique", "GL", "L2");
    let unit = make_unit(&mut sc, &scope, "INF201", 6, 1);
    let s1 = make_student(&mut sc, &scope, "S1", "M1");
    let s2 = make_student(&mut sc, &scope, "S2", "M2");
    let s3 = make_student(&mut sc, &scope, "S3", "M3");
    let s4 = make_student(&mut sc, &scope, "S4", "M4");
    make_student(&mut sc, &scope, "S5", "M5");
    grade(&mut sc, s1, unit, json!(8), json!(8), json!(8));
    grade(&mut sc, s2, unit, json!(16), json!(16), json!(16));
    grade(&mut sc, s3, unit, json!(12), json!(12), json!(12));
    grade(&mut sc, s4, unit, json!(20), json!(20), json!(null));

    let model = sc.ok(
        "directory.browse",
        json!({ "courseUnitId": unit, "sort": "final" }),
    );
    assert_eq!(model["sort"], json!("final"));
    assert_eq!(names(&model), vec!["S2", "S3", "S1", "S4", "S5"]);
    assert_eq!(model["rows"][0]["grade"]["final"].as_f64(), Some(16.0));
    assert_eq!(model["rows"][3]["grade"]["isEliminated"], json!(true));
    assert!(model["rows"][4]["grade"].is_null());

    // Without a selected unit the final sort degrades to name order.
    let model = sc.ok("directory.browse", json!({ "sort": "final" }));
    assert_eq!(model["sort"], json!("name"));
    assert_eq!(names(&model), vec!["S1", "S2", "S3", "S4", "S5"]);
}

#[test]
fn sort_by_final_follows_the_displayed_rounding() {
    let (_dir, mut sc) = admin_session();
    let scope = make_scope(&mut sc, "Informatique", "GL", "L2");
    let unit = make_unit(&mut sc, &scope, "INF201", 6, 1);
    let aaron = make_student(&mut sc, &scope, "Aaron", "M1");
    let zed = make_student(&mut sc, &scope, "Zed", "M2");
    grade(&mut sc, aaron, unit, json!(10.25), json!(10.25), json!(10.25));
    let g = grade(&mut sc, zed, unit, json!(0.25), json!(12.25), json!(13.06));
    assert_eq!(g["final"].as_f64(), Some(10.26));

    let model = sc.ok(
        "directory.browse",
        json!({ "courseUnitId": unit, "sort": "final" }),
    );
    assert_eq!(names(&model), vec!["Zed", "Aaron"]);
    let finals: Vec<f64> = model["rows"]
        .as_array()
        .expect("rows")
        .iter()
        .map(|r| r["grade"]["final"].as_f64().expect("final"))
        .collect();
    assert_eq!(finals, vec![10.26, 10.25]);
}

#[test]
fn sort_by_matricule_and_page_clamping() {
    let (_dir, mut sc) = admin_session();
    let scope = make_scope(&mut sc, "Informatique", "GL", "L2");
    for (name, code) in [("Eve", "E1"), ("Dan", "D9"), ("Cid", "C3"), ("Bea", "B7"), ("Ana", "A5")] {
        make_student(&mut sc, &scope, name, code);
    }

    let model = sc.ok(
        "directory.browse",
        json!({ "sort": "matricule", "pageSize": 2 }),
    );
    assert_eq!(names(&model), vec!["Ana", "Bea"]);
    assert_eq!(model["paging"]["numPages"], json!(3));
    assert_eq!(model["paging"]["total"], json!(5));

    let last = sc.ok("directory.browse", json!({ "pageSize": 2, "page": 99 }));
    assert_eq!(last["paging"]["page"], json!(3));
    assert_eq!(names(&last), vec!["Eve"]);

    let first = sc.ok("directory.browse", json!({ "pageSize": 2, "page": 0 }));
    assert_eq!(first["paging"]["page"], json!(1));
    assert_eq!(names(&first), vec!["Ana", "Bea"]);
}

#[test]
fn page_size_default_comes_from_settings() {
    let (_dir, mut sc) = admin_session();
    let scope = make_scope(&mut sc, "Informatique", "GL", "L2");
    for i in 0..4 {
        make_student(&mut sc, &scope, &format!("Student {i}"), &format!("M{i}"));
    }
    sc.ok(
        "setup.update",
        json!({ "section": "directory", "patch": { "pageSize": 3 } }),
    );
    let model = sc.ok("directory.browse", json!({}));
    assert_eq!(model["paging"]["pageSize"], json!(3));
    assert_eq!(model["rows"].as_array().map(Vec::len), Some(3));
}

#[test]
fn empty_workspace_browses_to_an_empty_first_page() {
    let (_dir, mut sc) = admin_session();
    let model = sc.ok("directory.browse", json!({ "page": 4 }));
    assert!(model["selected"]["departmentId"].is_null());
    assert_eq!(model["paging"]["page"], json!(1));
    assert_eq!(model["rows"].as_array().map(Vec::len), Some(0));
}
