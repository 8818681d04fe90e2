//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles:
//! - No blocking sleep in production code (everything runs on one cooperative loop)
//! - The headless core never touches the terminal
//! - Every declared dependency is used by the code it ships with
//!
//! The helpers here walk the workspace sources and hand the tests only the
//! production lines of each file, with `#[cfg(test)]` modules and comments
//! stripped.

use std::fs;
use std::path::{Path, PathBuf};

/// Workspace root, two levels above this package
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

/// A production source line
#[derive(Debug, Clone)]
pub struct SourceLine {
    /// File the line came from
    pub path: PathBuf,
    /// 1-based line number
    pub number: usize,
    /// Code with any trailing `//` comment removed
    pub code: String,
}

impl std::fmt::Display for SourceLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} - {}", self.path.display(), self.number, self.code.trim())
    }
}

/// Every `.rs` file under `dir` (relative to the workspace root)
#[must_use]
pub fn rust_files(dir: &str) -> Vec<PathBuf> {
    let root = workspace_root().join(dir);
    if !root.exists() {
        return Vec::new();
    }
    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(|e| e.into_path())
        .collect()
}

/// Production lines of every source file under `dir`
#[must_use]
pub fn production_lines(dir: &str) -> Vec<SourceLine> {
    rust_files(dir)
        .iter()
        .flat_map(|path| production_lines_of(path))
        .collect()
}

/// Production lines of one file
///
/// Stops at the first `#[cfg(test)]`; test modules sit at the bottom of
/// each file in this workspace.
#[must_use]
pub fn production_lines_of(path: &Path) -> Vec<SourceLine> {
    let Ok(content) = fs::read_to_string(path) else {
        return Vec::new();
    };

    let mut lines = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("#[cfg(test)]") {
            break;
        }
        if trimmed.starts_with("//") {
            continue;
        }
        let code = line.split("//").next().unwrap_or(line);
        lines.push(SourceLine {
            path: path.to_path_buf(),
            number: idx + 1,
            code: code.to_string(),
        });
    }
    lines
}

/// Dependency names declared in one table of a manifest
///
/// `table` is the bare table name, e.g. `dependencies`.
#[must_use]
pub fn dependency_names(manifest: &str, table: &str) -> Vec<String> {
    let Ok(content) = fs::read_to_string(workspace_root().join(manifest)) else {
        return Vec::new();
    };
    let header = format!("[{table}]");

    let mut names = Vec::new();
    let mut inside = false;
    for line in content.lines().map(str::trim) {
        if line.starts_with('[') {
            inside = line == header;
            continue;
        }
        if !inside || line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((name, _)) = line.split_once('=') {
            names.push(name.trim().to_string());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stops_at_test_module() {
        let dir = std::env::temp_dir().join(format!("arch-enforce-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let file = dir.join("sample.rs");
        fs::write(
            &file,
            "fn a() {} // trailing\n// whole comment\n#[cfg(test)]\nmod tests { fn b() {} }\n",
        )
        .unwrap();

        let lines = production_lines_of(&file);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].code.trim(), "fn a() {}");
        assert_eq!(lines[0].number, 1);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_dependency_names_reads_one_table() {
        let names = dependency_names("tests/architectural-enforcement/Cargo.toml", "dependencies");
        assert_eq!(names, vec!["walkdir".to_string()]);
        assert!(dependency_names("tests/architectural-enforcement/Cargo.toml", "dev-dependencies").is_empty());
    }
}
