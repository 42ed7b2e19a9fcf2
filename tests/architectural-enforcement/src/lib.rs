//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce source-level rules
//! on the workspace crates:
//! - No blocking I/O inside async functions
//! - No `unwrap()` / `expect()` in library code
//! - No sleeping in production code
//!
//! The helpers below scan Rust sources line by line. They are heuristics:
//! everything after the first top-level `#[cfg(test)]` counts as test code,
//! and the enclosing function of a line is the nearest `fn` signature above
//! it.

use std::fs;
use std::path::{Path, PathBuf};

/// Production source directories, relative to the workspace root
pub const PRODUCTION_DIRS: &[&str] = &["lightspeed/core/src", "lightspeed/cli/src"];

/// Library source directories (stricter rules apply)
pub const LIBRARY_DIRS: &[&str] = &["lightspeed/core/src"];

/// Workspace root, derived from this crate's manifest directory
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

/// A production line of a source file
#[derive(Debug)]
pub struct SourceLine<'a> {
    /// File the line belongs to
    pub path: &'a Path,
    /// 1-based line number
    pub number: usize,
    /// Code before any `//` comment
    pub code: &'a str,
    /// The full line
    pub text: &'a str,
    /// Whether the enclosing function is `async`
    pub in_async_fn: bool,
}

impl std::fmt::Display for SourceLine<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} - {}", self.path.display(), self.number, self.text.trim())
    }
}

/// A loaded source file
#[derive(Debug)]
pub struct SourceFile {
    /// Path on disk
    pub path: PathBuf,
    /// File contents
    pub content: String,
}

impl SourceFile {
    /// Lines that are neither test code nor pure comments
    #[must_use]
    pub fn production_lines(&self) -> Vec<SourceLine<'_>> {
        let lines: Vec<&str> = self.content.lines().collect();
        let mut result = Vec::new();
        let mut in_async_fn = false;

        for (idx, line) in lines.iter().enumerate() {
            if line.starts_with("#[cfg(test)]") {
                break;
            }
            if let Some(is_async) = fn_signature(line) {
                in_async_fn = is_async;
            }

            let code = line.split("//").next().unwrap_or(line);
            if code.trim().is_empty() {
                continue;
            }

            result.push(SourceLine {
                path: &self.path,
                number: idx + 1,
                code,
                text: line,
                in_async_fn,
            });
        }
        result
    }
}

/// If `line` starts a function, whether that function is `async`
#[must_use]
pub fn fn_signature(line: &str) -> Option<bool> {
    let mut rest = line.trim_start();
    for prefix in ["pub(crate) ", "pub(super) ", "pub "] {
        if let Some(stripped) = rest.strip_prefix(prefix) {
            rest = stripped;
            break;
        }
    }

    if rest.starts_with("async fn ") {
        Some(true)
    } else if rest.starts_with("fn ") {
        Some(false)
    } else {
        None
    }
}

/// Load every `.rs` file under `dir` (relative to the workspace root)
#[must_use]
pub fn source_files(dir: &str) -> Vec<SourceFile> {
    let root = workspace_root().join(dir);
    if !root.exists() {
        return Vec::new();
    }

    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .filter_map(|e| {
            let content = fs::read_to_string(e.path()).ok()?;
            Some(SourceFile {
                path: e.path().to_path_buf(),
                content,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fn_signature() {
        assert_eq!(fn_signature("    pub async fn send(&mut self) {"), Some(true));
        assert_eq!(fn_signature("fn helper() {"), Some(false));
        assert_eq!(fn_signature("pub(crate) fn load() {"), Some(false));
        assert_eq!(fn_signature("    let f = fn_name();"), None);
    }

    #[test]
    fn test_production_lines_stop_at_tests() {
        let file = SourceFile {
            path: PathBuf::from("x.rs"),
            content: "\
//! Docs
async fn run() {
    work().await; // comment
}

fn sync() {}

#[cfg(test)]
mod tests {
    fn t() { x.unwrap(); }
}
"
            .to_string(),
        };

        let lines = file.production_lines();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].in_async_fn);
        assert_eq!(lines[1].code.trim(), "work().await;");
        assert!(!lines[3].in_async_fn);
        assert!(lines.iter().all(|l| !l.code.contains("unwrap")));
    }

    #[test]
    fn test_workspace_sources_found() {
        assert!(!source_files("lightspeed/core/src").is_empty());
    }
}
