// shared utilities for integration tests

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

/// path to the condwatch binary built for this test run
pub fn condwatch_binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_condwatch"))
}

/// create a scratch directory holding a conditions file
pub fn conditions_dir(content: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("Failed to create test directory");
    let path = dir.path().join("conditions.json5");
    std::fs::write(&path, content).expect("Failed to write conditions file");
    (dir, path)
}

/// run condwatch with the given arguments, feeding `stdin` if provided
pub fn run_condwatch(args: &[&str], stdin: Option<&str>) -> Output {
    let mut cmd = Command::new(condwatch_binary_path());
    cmd.args(args)
        .env_remove("CONDWATCH_CONFIG")
        .env_remove("RUST_LOG")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

    let mut child = cmd.spawn().expect("Failed to run condwatch");
    if let Some(input) = stdin {
        let mut pipe = child.stdin.take().expect("stdin should be piped");
        pipe.write_all(input.as_bytes())
            .expect("Failed to write stdin");
    }

    child.wait_with_output().expect("Failed to wait for condwatch")
}

/// parse every stdout line as a JSON value
pub fn json_lines(output: &Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str(line)
                .unwrap_or_else(|e| panic!("invalid JSON line {:?}: {}", line, e))
        })
        .collect()
}

/// `result` field of every JSON-RPC success line
pub fn results(output: &Output) -> Vec<serde_json::Value> {
    json_lines(output)
        .into_iter()
        .filter_map(|line| line.get("result").cloned())
        .collect()
}

pub fn path_str(path: &Path) -> &str {
    path.to_str().expect("test paths are valid UTF-8")
}

pub fn describe(output: &Output) -> String {
    format!(
        "exit code: {:?}\nstdout: {}\nstderr: {}",
        output.status.code(),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}
