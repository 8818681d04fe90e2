//! Integration Test: Headless Core
//!
//! **Policy**: `monitor-core` holds state and decisions only. Terminal
//! control (crossterm, ANSI output, raw mode) belongs to `monitor-tui`.

use std::fs;

use architectural_enforcement::{production_lines, workspace_root};

#[test]
fn test_core_sources_never_use_crossterm() {
    let violations: Vec<_> = production_lines("monitor/core/src")
        .into_iter()
        .filter(|line| line.code.contains("crossterm"))
        .collect();

    assert!(
        violations.is_empty(),
        "monitor-core must stay headless:\n{}",
        violations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    );
}

#[test]
fn test_core_manifest_has_no_terminal_dependencies() {
    let manifest = fs::read_to_string(workspace_root().join("monitor/core/Cargo.toml"))
        .expect("monitor-core manifest");
    for forbidden in ["crossterm", "ratatui", "termion"] {
        assert!(
            !manifest.contains(forbidden),
            "monitor-core depends on {forbidden}"
        );
    }
}

#[test]
fn test_core_never_writes_escape_sequences() {
    let violations: Vec<_> = production_lines("monitor/core/src")
        .into_iter()
        .filter(|line| line.code.contains("\\x1b[") || line.code.contains("\\u{1b}["))
        .collect();

    assert!(violations.is_empty(), "ANSI output in monitor-core: {violations:?}");
}
