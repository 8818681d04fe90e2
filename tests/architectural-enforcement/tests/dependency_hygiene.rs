//! Integration Test: Dependency Hygiene
//!
//! **Policy**: a crate's `[dependencies]` are the crates its production code
//! uses. Test-only crates live under `[dev-dependencies]`.

use std::fs;

use architectural_enforcement::{dependency_names, production_lines, rust_files, workspace_root};

/// (manifest, source directory) for every member with production code
const MEMBERS: [(&str, &str); 2] = [
    ("monitor/core/Cargo.toml", "monitor/core/src"),
    ("tui/Cargo.toml", "tui/src"),
];

#[test]
fn test_every_dependency_is_used_in_production() {
    let mut unused = Vec::new();
    for (manifest, src) in MEMBERS {
        let lines = production_lines(src);
        for name in dependency_names(manifest, "dependencies") {
            let path = format!("{}::", name.replace('-', "_"));
            if !lines.iter().any(|line| line.code.contains(&path)) {
                unused.push(format!("{manifest}: {name}"));
            }
        }
    }

    assert!(
        unused.is_empty(),
        "dependencies with no production use (drop them or move them to dev-dependencies):\n{}",
        unused.join("\n")
    );
}

#[test]
fn test_members_declare_dependencies() {
    for (manifest, _) in MEMBERS {
        assert!(
            !dependency_names(manifest, "dependencies").is_empty(),
            "{manifest} has no [dependencies] table"
        );
    }
}

#[test]
fn test_paused_clock_only_when_a_test_pauses_it() {
    for (manifest, src) in MEMBERS {
        let pauses = rust_files(src)
            .into_iter()
            .chain(rust_files(&src.replace("/src", "/tests")))
            .filter_map(|path| fs::read_to_string(path).ok())
            .any(|content| content.contains("start_paused") || content.contains("time::pause"));
        let manifest_text =
            fs::read_to_string(workspace_root().join(manifest)).expect("member manifest");

        if !pauses {
            assert!(
                !manifest_text.contains("test-util"),
                "{manifest} enables tokio test-util but no test pauses the clock"
            );
        }
    }
}
