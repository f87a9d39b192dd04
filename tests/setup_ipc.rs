mod common;

use common::{admin_session, Sidecar};
use serde_json::json;

#[test]
fn setup_get_returns_defaults_and_update_persists() {
    let (dir, mut sc) = admin_session();
    let setup = sc.ok("setup.get", json!({}));
    assert_eq!(setup["directory"]["pageSize"], json!(20));
    assert_eq!(setup["gradeTable"]["pageSize"], json!(25));
    assert_eq!(setup["exchange"]["maxRows"], json!(5000));

    sc.ok(
        "setup.update",
        json!({ "section": "gradeTable", "patch": { "pageSize": 40 } }),
    );
    drop(sc);

    // Settings survive a restart of the sidecar.
    let mut sc = Sidecar::spawn();
    sc.select_workspace(dir.path());
    let setup = sc.ok("setup.get", json!({}));
    assert_eq!(setup["gradeTable"]["pageSize"], json!(40));
    assert_eq!(setup["directory"]["pageSize"], json!(20));
}

#[test]
fn setup_update_validates_sections_and_fields() {
    let (_dir, mut sc) = admin_session();
    for params in [
        json!({ "section": "nope", "patch": {} }),
        json!({ "section": "directory" }),
        json!({ "section": "directory", "patch": { "pageSize": 0 } }),
        json!({ "section": "directory", "patch": { "pageSize": "ten" } }),
        json!({ "section": "directory", "patch": { "maxRows": 10 } }),
        json!({ "section": "exchange", "patch": { "maxRows": 1_000_000 } }),
    ] {
        assert_eq!(sc.err_code("setup.update", params), "bad_params");
    }

    sc.ok("users.create", json!({ "username": "prof", "isStaff": false }));
    sc.login("prof");
    assert_eq!(
        sc.err_code(
            "setup.update",
            json!({ "section": "directory", "patch": { "pageSize": 5 } })
        ),
        "forbidden"
    );
}
