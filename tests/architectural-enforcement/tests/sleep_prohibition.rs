//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code MUST NOT block the event loop with
//! `std::thread::sleep`. Delays go through the loop as scheduled events
//! (`tokio::time::sleep` inside a spawned timer task, or `interval`).
//! **Exceptions**: test code

use architectural_enforcement::production_lines;

const PRODUCTION_DIRS: [&str; 2] = ["monitor/core/src", "tui/src"];

#[test]
fn test_no_thread_sleep_in_production_code() {
    let violations: Vec<_> = PRODUCTION_DIRS
        .iter()
        .flat_map(|dir| production_lines(dir))
        .filter(|line| line.code.contains("thread::sleep"))
        .collect();

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Blocking sleep found in production code!\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n✅ Schedule a DashboardEvent instead (Effect::Schedule)");

        panic!(
            "\nFound {} blocking sleep(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

#[test]
fn test_production_dirs_exist() {
    for dir in PRODUCTION_DIRS {
        assert!(
            !architectural_enforcement::rust_files(dir).is_empty(),
            "no sources found under {dir}"
        );
    }
}
