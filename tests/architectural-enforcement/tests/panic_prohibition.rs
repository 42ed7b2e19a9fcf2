//! Integration Test: No Panicking Shortcuts in the Library
//!
//! **Policy**: `lightspeed-core` propagates errors. Production code MUST NOT
//! call `.unwrap()` or `.expect(...)`, and MUST NOT sleep.
//! **Exceptions**: test code.

use architectural_enforcement::{source_files, LIBRARY_DIRS, PRODUCTION_DIRS};

/// Test that library code never unwraps
#[test]
fn test_no_unwrap_in_library_code() {
    let mut violations = Vec::new();
    for dir in LIBRARY_DIRS {
        for file in source_files(dir) {
            for line in file.production_lines() {
                if line.code.contains(".unwrap()") || line.code.contains(".expect(") {
                    violations.push(line.to_string());
                }
            }
        }
    }

    if !violations.is_empty() {
        for violation in &violations {
            eprintln!("  {violation}");
        }
        panic!(
            "\nFound {} unwrap/expect call(s) in library code. Return an error instead.",
            violations.len()
        );
    }
}

/// Test that production code does not sleep
#[test]
fn test_no_sleep_in_production_code() {
    let mut violations = Vec::new();
    for dir in PRODUCTION_DIRS {
        for file in source_files(dir) {
            for line in file.production_lines() {
                if line.code.contains("thread::sleep") || line.code.contains("time::sleep") {
                    violations.push(line.to_string());
                }
            }
        }
    }
    assert!(violations.is_empty(), "Sleep calls: {violations:#?}");
}
