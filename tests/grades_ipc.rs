mod common;

use common::{admin_session, grade, make_scope, make_student, make_unit, Sidecar};
use serde_json::json;

#[test]
fn final_is_derived_from_unit_weights_and_missing_components_eliminate() {
    let (_dir, mut sc) = admin_session();
    let scope = make_scope(&mut sc, "Informatique", "GL", "L2");
    let unit = make_unit(&mut sc, &scope, "INF201", 6, 1);
    let alice = make_student(&mut sc, &scope, "Alice", "A001");
    let bob = make_student(&mut sc, &scope, "Bob", "B002");

    let g = grade(&mut sc, alice, unit, json!(12), json!(14), json!(16));
    assert_eq!(g["final"].as_f64(), Some(14.6));
    assert_eq!(g["isEliminated"], json!(false));

    let g = grade(&mut sc, bob, unit, json!("11.5"), json!(null), json!(""));
    assert!(g["final"].is_null());
    assert_eq!(g["isEliminated"], json!(true));
    assert_eq!(g["cc"].as_f64(), Some(11.5));
    assert!(g["sn"].is_null());

    let fetched = sc.ok("grades.get", json!({ "gradeId": g["gradeId"] }));
    assert_eq!(fetched["grade"]["isEliminated"], json!(true));
}

#[test]
fn second_create_for_same_pair_is_a_conflict_not_an_overwrite() {
    let (_dir, mut sc) = admin_session();
    let scope = make_scope(&mut sc, "Informatique", "GL", "L2");
    let unit = make_unit(&mut sc, &scope, "INF201", 6, 1);
    let alice = make_student(&mut sc, &scope, "Alice", "A001");
    let first = grade(&mut sc, alice, unit, json!(12), json!(14), json!(16));

    let resp = sc.request(
        "grades.create",
        json!({ "studentId": alice, "courseUnitId": unit, "cc": 1, "tp": 1, "sn": 1 }),
    );
    assert_eq!(resp["ok"], json!(false));
    assert_eq!(resp["error"]["code"], json!("conflict"));
    assert!(resp["error"]["message"]
        .as_str()
        .unwrap_or("")
        .contains("already exists"));

    let kept = sc.ok("grades.get", json!({ "gradeId": first["gradeId"] }));
    assert_eq!(kept["grade"]["final"].as_f64(), Some(14.6));
}

#[test]
fn create_checks_ids_then_values_then_existence() {
    let (_dir, mut sc) = admin_session();
    let scope = make_scope(&mut sc, "Informatique", "GL", "L2");
    let unit = make_unit(&mut sc, &scope, "INF201", 6, 1);
    let alice = make_student(&mut sc, &scope, "Alice", "A001");

    assert_eq!(
        sc.err_code("grades.create", json!({ "courseUnitId": unit, "cc": 10 })),
        "bad_params"
    );
    assert_eq!(
        sc.err_code(
            "grades.create",
            json!({ "studentId": 999, "courseUnitId": unit, "cc": 25, "tp": 1, "sn": 1 })
        ),
        "bad_params"
    );
    assert_eq!(
        sc.err_code(
            "grades.create",
            json!({ "studentId": alice, "courseUnitId": unit, "cc": "douze", "tp": 1, "sn": 1 })
        ),
        "bad_params"
    );
    assert_eq!(
        sc.err_code(
            "grades.create",
            json!({ "studentId": 999, "courseUnitId": unit, "cc": 10, "tp": 1, "sn": 1 })
        ),
        "not_found"
    );
    assert_eq!(
        sc.err_code(
            "grades.create",
            json!({ "studentId": alice, "courseUnitId": 999, "cc": 10, "tp": 1, "sn": 1 })
        ),
        "not_found"
    );
}

#[test]
fn update_replaces_all_three_components() {
    let (_dir, mut sc) = admin_session();
    let scope = make_scope(&mut sc, "Informatique", "GL", "L2");
    let unit = make_unit(&mut sc, &scope, "INF201", 6, 1);
    let alice = make_student(&mut sc, &scope, "Alice", "A001");
    let g = grade(&mut sc, alice, unit, json!(12), json!(14), json!(16));

    let updated = sc.ok(
        "grades.update",
        json!({ "gradeId": g["gradeId"], "cc": 10, "tp": null, "sn": 10 }),
    );
    assert!(updated["grade"]["tp"].is_null());
    assert_eq!(updated["grade"]["isEliminated"], json!(true));

    assert_eq!(
        sc.err_code(
            "grades.update",
            json!({ "gradeId": g["gradeId"], "cc": 10, "tp": -1, "sn": 10 })
        ),
        "bad_params"
    );
    assert_eq!(
        sc.err_code(
            "grades.update",
            json!({ "gradeId": 4242, "cc": 10, "tp": 10, "sn": 10 })
        ),
        "not_found"
    );
}

#[test]
fn reweighting_a_unit_changes_existing_finals() {
    let (_dir, mut sc) = admin_session();
    let scope = make_scope(&mut sc, "Informatique", "GL", "L2");
    let unit = make_unit(&mut sc, &scope, "INF201", 6, 1);
    let alice = make_student(&mut sc, &scope, "Alice", "A001");
    let g = grade(&mut sc, alice, unit, json!(12), json!(14), json!(16));

    sc.ok(
        "courseUnits.update",
        json!({ "courseUnitId": unit, "ccWeight": 0, "tpWeight": 0, "snWeight": 100 }),
    );
    let fetched = sc.ok("grades.get", json!({ "gradeId": g["gradeId"] }));
    assert_eq!(fetched["grade"]["final"].as_f64(), Some(16.0));
}

#[test]
fn grade_writes_require_a_session_and_a_workspace() {
    let mut sc = Sidecar::spawn();
    assert_eq!(
        sc.err_code(
            "grades.create",
            json!({ "studentId": 1, "courseUnitId": 1, "cc": 1, "tp": 1, "sn": 1 })
        ),
        "no_workspace"
    );

    let dir = tempfile::tempdir().expect("tempdir");
    sc.select_workspace(dir.path());
    assert_eq!(
        sc.err_code(
            "grades.create",
            json!({ "studentId": 1, "courseUnitId": 1, "cc": 1, "tp": 1, "sn": 1 })
        ),
        "unauthenticated"
    );
}
