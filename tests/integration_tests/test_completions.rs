// integration tests for shell completions

use crate::common::*;

#[test]
fn test_completions_for_each_shell() {
    for shell in ["bash", "zsh", "fish"] {
        let output = run_condwatch(&["completions", shell], None);
        assert!(output.status.success(), "{}: {}", shell, describe(&output));

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("condwatch"), "{} completions should name the binary", shell);
        assert!(stdout.contains("replay"), "{} completions should list subcommands", shell);
    }
}

#[test]
fn test_completions_rejects_unknown_shell() {
    let output = run_condwatch(&["completions", "tcsh"], None);
    assert!(!output.status.success());
}
