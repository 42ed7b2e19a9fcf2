//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: Async code in the workspace MUST NOT use blocking I/O.
//! **Required**: Use `tokio::fs`, `tokio::io`, and async `reqwest`, not
//! `std::fs`, `std::net`, or `reqwest::blocking`.
//!
//! Blocking calls are acceptable in non-async functions (configuration is
//! loaded before the runtime does any work) and in test code.

use architectural_enforcement::{source_files, SourceLine, PRODUCTION_DIRS};

/// Test that async production code does not use blocking I/O
#[test]
fn test_no_blocking_io_in_async_code() {
    let violations = find_blocking_io_violations();

    if !violations.is_empty() {
        eprintln!("\nBlocking I/O calls found in async production code:\n");
        for violation in &violations {
            eprintln!("  {violation}");
        }
        eprintln!("\nFORBIDDEN in async fn:");
        eprintln!("  - std::fs::*, std::net::*, std::process::Command");
        eprintln!("  - std::io::stdin(), std::io::stdout()");
        eprintln!("  - reqwest::blocking::*");
        eprintln!("\nREQUIRED:");
        eprintln!("  - tokio::fs::read().await, tokio::io::stdout()");
        eprintln!("  - reqwest::Client (async)");

        panic!(
            "\nFound {} blocking I/O violation(s) in production code.",
            violations.len()
        );
    }
}

/// Test that no production code uses the blocking HTTP client at all
#[test]
fn test_no_blocking_http_client() {
    let mut violations = Vec::new();
    for dir in PRODUCTION_DIRS {
        for file in source_files(dir) {
            for line in file.production_lines() {
                if line.code.contains("reqwest::blocking") {
                    violations.push(line.to_string());
                }
            }
        }
    }
    assert!(violations.is_empty(), "Blocking HTTP client: {violations:#?}");
}

fn find_blocking_io_violations() -> Vec<String> {
    let mut violations = Vec::new();
    for dir in PRODUCTION_DIRS {
        for file in source_files(dir) {
            for line in file.production_lines() {
                if let Some(kind) = blocking_call(&line) {
                    violations.push(format!("{line} ({kind})"));
                }
            }
        }
    }
    violations
}

/// Classify a blocking call made from async code
fn blocking_call(line: &SourceLine<'_>) -> Option<&'static str> {
    if !line.in_async_fn {
        return None;
    }
    let code = line.code;

    if code.contains("std::fs::") {
        Some("blocking file I/O")
    } else if code.contains("std::net::") {
        Some("blocking network I/O")
    } else if code.contains("std::process::Command") {
        Some("blocking process I/O")
    } else if code.contains("std::io::stdin()") || code.contains("std::io::stdout()") {
        Some("blocking stdin/stdout")
    } else {
        None
    }
}
