// integration tests for the replay command

use crate::common::*;
use serde_json::json;

const VIEW_LIVE: &str = r#"{ conditions: [{ condition: "view", views: ["live"] }] }"#;

#[test]
fn test_replay_view_transition() {
    let (_dir, path) = conditions_dir(VIEW_LIVE);

    let input = "{\"view\": \"media\"}\n{\"view\": \"live\"}\n";
    let output = run_condwatch(&["--json", "replay", path_str(&path)], Some(input));
    assert!(output.status.success(), "{}", describe(&output));

    let results = results(&output);
    assert_eq!(results.len(), 2, "{}", describe(&output));

    assert_eq!(results[0]["event"], json!("change"));
    assert_eq!(results[0]["line"], json!(2));
    assert_eq!(results[0]["result"], json!(true));
    assert_eq!(
        results[0]["trigger_data"],
        json!({ "view": { "from": "media", "to": "live" } })
    );

    assert_eq!(results[1]["event"], json!("final"));
    assert_eq!(results[1]["result"], json!(true));
    assert_eq!(results[1]["trigger_data"], results[0]["trigger_data"]);
}

#[test]
fn test_replay_repeated_state_is_silent() {
    let (_dir, path) = conditions_dir(VIEW_LIVE);

    let input = "{\"view\": \"live\"}\n{\"view\": \"live\"}\n{\"view\": \"live\"}\n";
    let output = run_condwatch(&["--json", "replay", path_str(&path)], Some(input));
    assert!(output.status.success(), "{}", describe(&output));

    let events: Vec<_> = results(&output)
        .iter()
        .map(|r| r["event"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(events, vec!["change", "final"]);
}

#[test]
fn test_replay_view_changes_without_filter_notify_each_time() {
    let (_dir, path) = conditions_dir(r#"[{ condition: "view" }]"#);

    let input = "{\"view\": \"live\"}\n{\"view\": \"media\"}\n{\"view\": \"clips\"}\n";
    let output = run_condwatch(&["--json", "replay", path_str(&path)], Some(input));
    assert!(output.status.success(), "{}", describe(&output));

    let changes: Vec<_> = results(&output)
        .into_iter()
        .filter(|r| r["event"] == json!("change"))
        .collect();
    assert_eq!(changes.len(), 3);
    assert!(changes.iter().all(|c| c["result"] == json!(true)));
    assert_eq!(
        changes[2]["trigger_data"]["view"],
        json!({ "from": "media", "to": "clips" })
    );
}

#[test]
fn test_replay_skips_comments_and_blank_lines() {
    let (_dir, path) = conditions_dir(r#"[{ condition: "fullscreen", fullscreen: true }]"#);

    let input = "# enter fullscreen\n\n{\"fullscreen\": true}\n";
    let output = run_condwatch(&["--json", "replay", path_str(&path)], Some(input));
    assert!(output.status.success(), "{}", describe(&output));

    let results = results(&output);
    assert_eq!(results[0]["line"], json!(3));
    assert_eq!(results[0]["result"], json!(true));
}

#[test]
fn test_replay_media_queries() {
    let (_dir, path) = conditions_dir(
        r#"{
            conditions: [{ condition: "screen", media_query: "(orientation: landscape)" }],
            settings: { print_initial: true },
        }"#,
    );

    let input = "{\"$media\": {\"(orientation: landscape)\": false}}\n";
    let output = run_condwatch(
        &[
            "--json",
            "replay",
            path_str(&path),
            "--media",
            "(orientation: landscape)=true",
        ],
        Some(input),
    );
    assert!(output.status.success(), "{}", describe(&output));

    let results = results(&output);
    let summary: Vec<_> = results
        .iter()
        .map(|r| (r["event"].as_str().unwrap(), r["result"].as_bool().unwrap()))
        .collect();
    assert_eq!(
        summary,
        vec![("initial", true), ("change", false), ("final", false)]
    );
}

#[test]
fn test_replay_initial_state_from_file() {
    let (_dir, path) = conditions_dir(
        r#"{
            conditions: [{ condition: "numeric_state", entity: "sensor.temp", above: 20 }],
            initial_state: { state: { "sensor.temp": { state: "25" } } },
            settings: { print_initial: true },
        }"#,
    );

    let input = "{\"state\": {\"sensor.temp\": {\"state\": \"18\"}}}\n";
    let output = run_condwatch(&["--json", "replay", path_str(&path)], Some(input));
    assert!(output.status.success(), "{}", describe(&output));

    let results = results(&output);
    assert_eq!(results[0]["event"], json!("initial"));
    assert_eq!(results[0]["result"], json!(true));
    assert_eq!(results[1]["event"], json!("change"));
    assert_eq!(results[1]["result"], json!(false));
}

#[test]
fn test_replay_from_input_file() {
    let (dir, path) = conditions_dir(r#"[{ condition: "camera", cameras: ["front"] }]"#);
    let input_path = dir.path().join("input.jsonl");
    std::fs::write(&input_path, "{\"camera\": \"back\"}\n{\"camera\": \"front\"}\n").unwrap();

    let output = run_condwatch(
        &[
            "--json",
            "replay",
            path_str(&path),
            "--input",
            path_str(&input_path),
        ],
        None,
    );
    assert!(output.status.success(), "{}", describe(&output));

    let results = results(&output);
    assert_eq!(results[0]["line"], json!(2));
    assert_eq!(
        results[0]["trigger_data"]["camera"],
        json!({ "from": "back", "to": "front" })
    );
}

#[test]
fn test_replay_text_output() {
    let (_dir, path) = conditions_dir(VIEW_LIVE);

    let input = "{\"view\": \"media\"}\n{\"view\": \"live\"}\n";
    let output = run_condwatch(&["--no-json", "replay", path_str(&path)], Some(input));
    assert!(output.status.success(), "{}", describe(&output));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("line 2: true (view: media -> live)"),
        "{}",
        stdout
    );
    assert!(stdout.contains("final: true"), "{}", stdout);
}

#[test]
fn test_replay_quiet_prints_nothing() {
    let (_dir, path) = conditions_dir(VIEW_LIVE);

    let input = "{\"view\": \"live\"}\n";
    let output = run_condwatch(&["--quiet", "replay", path_str(&path)], Some(input));
    assert!(output.status.success(), "{}", describe(&output));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_replay_malformed_line_fails_with_line_number() {
    let (_dir, path) = conditions_dir(VIEW_LIVE);

    let input = "{\"view\": \"live\"}\nnot json\n";
    let output = run_condwatch(&["--no-json", "replay", path_str(&path)], Some(input));
    assert_eq!(output.status.code(), Some(8), "{}", describe(&output));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("line 2"), "{}", stderr);
}

#[test]
fn test_replay_invalid_pattern_fails_at_evaluation() {
    let (_dir, path) = conditions_dir(r#"[{ condition: "user_agent", user_agent_re: "(" }]"#);

    let input = "{\"user_agent\": \"Mozilla/5.0\"}\n";
    let output = run_condwatch(&["--json", "replay", path_str(&path)], Some(input));
    assert_eq!(output.status.code(), Some(8), "{}", describe(&output));

    let lines = json_lines(&output);
    let error = lines
        .iter()
        .find_map(|l| l.get("error"))
        .expect("should print a JSON-RPC error");
    assert_eq!(error["code"], json!(-32008));
    assert!(error["message"]
        .as_str()
        .unwrap()
        .contains("invalid user agent pattern"));
}

#[test]
fn test_replay_config_error() {
    let (_dir, path) = conditions_dir(r#"[{ condition: "weather" }]"#);

    let output = run_condwatch(&["--no-json", "replay", path_str(&path)], Some(""));
    assert_eq!(output.status.code(), Some(5), "{}", describe(&output));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown condition"));
}

#[test]
fn test_replay_uses_env_config() {
    let (_dir, path) = conditions_dir(r#"[{ condition: "initialized" }]"#);

    let output = std::process::Command::new(condwatch_binary_path())
        .args(["--json", "replay", "--input", "/dev/null"])
        .env("CONDWATCH_CONFIG", &path)
        .output()
        .expect("Failed to run condwatch");
    assert!(output.status.success(), "{}", describe(&output));

    let results = results(&output);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["event"], json!("final"));
    assert_eq!(results[0]["result"], json!(false));
}
