// integration tests for the check command

use crate::common::*;

#[test]
fn test_check_valid_file() {
    let (_dir, path) = conditions_dir(
        r#"{
            conditions: [
                { condition: "view", views: ["live"] },
                { entity: "light.kitchen", state: ["on", "dim"] },
            ],
        }"#,
    );

    let output = run_condwatch(&["--no-json", "check", path_str(&path)], None);
    assert!(output.status.success(), "{}", describe(&output));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("valid"), "{}", stdout);
}

#[test]
fn test_check_valid_file_json() {
    let (_dir, path) = conditions_dir(r#"[{ condition: "initialized" }, { condition: "fullscreen", fullscreen: true }]"#);

    let output = run_condwatch(&["--json", "check", path_str(&path)], None);
    assert!(output.status.success(), "{}", describe(&output));

    let results = results(&output);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["valid"], serde_json::json!(true));
    assert_eq!(results[0]["conditions"], serde_json::json!(2));
}

#[test]
fn test_check_reports_problems_with_config_error() {
    let (_dir, path) = conditions_dir(
        r#"[
            { condition: "numeric_state", entity: "sensor.temp", above: 30, below: 10 },
            { condition: "weather" },
        ]"#,
    );

    let output = run_condwatch(&["--no-json", "check", path_str(&path)], None);
    assert_eq!(output.status.code(), Some(5), "{}", describe(&output));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("2 error(s)"), "{}", stderr);
    assert!(stderr.contains("conditions[0]"), "{}", stderr);
    assert!(stderr.contains("unknown condition: 'weather'"), "{}", stderr);
}

#[test]
fn test_check_problems_json() {
    let (_dir, path) = conditions_dir(r#"[{ condition: "user_agent", user_agent_re: "(" }]"#);

    let output = run_condwatch(&["--json", "check", path_str(&path)], None);
    assert_eq!(output.status.code(), Some(5), "{}", describe(&output));

    let lines = json_lines(&output);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["error"]["code"], serde_json::json!(-32005));
    let details = lines[0]["error"]["details"].as_array().unwrap();
    assert!(details[0].as_str().unwrap().contains("invalid user_agent_re"));
}

#[test]
fn test_check_missing_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("missing.json5");

    let output = run_condwatch(&["--no-json", "check", path_str(&path)], None);
    assert_eq!(output.status.code(), Some(5), "{}", describe(&output));
    assert!(String::from_utf8_lossy(&output.stderr).contains("not found"));
}

#[test]
fn test_check_uses_config_flag() {
    let (_dir, path) = conditions_dir(r#"[{ condition: "expand", expand: true }]"#);

    let output = run_condwatch(&["--config", path_str(&path), "--quiet", "check"], None);
    assert!(output.status.success(), "{}", describe(&output));
    assert!(output.stdout.is_empty());
}
