mod common;

use common::{admin_session, grade, make_scope, make_student, make_unit};
use serde_json::json;

#[test]
fn average_is_credit_weighted_over_non_eliminated_grades() {
    let (_dir, mut sc) = admin_session();
    let scope = make_scope(&mut sc, "Informatique", "GL", "L2");
    let algo = make_unit(&mut sc, &scope, "INF201", 6, 1);
    let web = make_unit(&mut sc, &scope, "INF202", 4, 1);
    let reseau = make_unit(&mut sc, &scope, "INF251", 3, 2);
    let alice = make_student(&mut sc, &scope, "Alice", "A001");

    grade(&mut sc, alice, algo, json!(12), json!(14), json!(16));
    grade(&mut sc, alice, web, json!(10), json!(10), json!(10));
    grade(&mut sc, alice, reseau, json!(18), json!(null), json!(18));

    let avg = sc.ok("transcript.average", json!({ "studentId": alice }));
    assert_eq!(avg["studentId"], json!(alice));
    assert_eq!(avg["average"].as_f64(), Some(12.76));

    let t = sc.ok("transcript.get", json!({ "studentId": alice }));
    assert_eq!(t["student"]["matricule"], json!("A001"));
    assert_eq!(t["student"]["program"], json!("GL"));
    assert_eq!(t["student"]["level"], json!("L2"));
    assert_eq!(t["average"].as_f64(), Some(12.76));
    assert!(t["generatedAt"].as_str().map(|s| !s.is_empty()).unwrap_or(false));
    let lines = t["lines"].as_array().expect("lines");
    let codes: Vec<&str> = lines.iter().filter_map(|l| l["code"].as_str()).collect();
    assert_eq!(codes, vec!["INF201", "INF202", "INF251"]);
    assert_eq!(lines[0]["status"], json!("Valide"));
    assert_eq!(lines[2]["status"], json!("Éliminé"));
    assert!(lines[2]["final"].is_null());
}

#[test]
fn student_without_qualifying_grades_has_no_average() {
    let (_dir, mut sc) = admin_session();
    let scope = make_scope(&mut sc, "Informatique", "GL", "L2");
    let unit = make_unit(&mut sc, &scope, "INF201", 6, 1);
    let bob = make_student(&mut sc, &scope, "Bob", "B002");

    let avg = sc.ok("transcript.average", json!({ "studentId": bob }));
    assert!(avg["average"].is_null());

    grade(&mut sc, bob, unit, json!(null), json!(10), json!(10));
    let avg = sc.ok("transcript.average", json!({ "studentId": bob }));
    assert!(avg["average"].is_null());

    assert_eq!(
        sc.err_code("transcript.get", json!({ "studentId": 4040 })),
        "not_found"
    );
}

#[test]
fn unclassified_student_has_null_program_and_level() {
    let (_dir, mut sc) = admin_session();
    let scope = make_scope(&mut sc, "Informatique", "GL", "L2");
    let alice = make_student(&mut sc, &scope, "Alice", "A001");
    sc.ok("programs.delete", json!({ "programId": scope.program }));

    let t = sc.ok("transcript.get", json!({ "studentId": alice }));
    assert!(t["student"]["program"].is_null());
    assert_eq!(t["student"]["level"], json!("L2"));
    assert!(sc.ok("courseUnits.forStudent", json!({ "studentId": alice }))["courseUnits"]
        .as_array()
        .map(Vec::is_empty)
        .unwrap_or(false));
}
