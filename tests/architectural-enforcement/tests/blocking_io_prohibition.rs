//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: Robot, model and console I/O goes through async handles.
//! Blocking clients or std console handles would stall the session runtime.

use architectural_enforcement::{scan_blocking, scan_dir, workspace_root, BLOCKING_PATTERNS};

#[test]
fn test_no_blocking_io_in_production_code() {
    let root = workspace_root();
    let mut violations = Vec::new();
    for dir in ["oracle/core/src", "oracle/cli/src"] {
        violations.extend(scan_dir(&root.join(dir), scan_blocking));
    }

    if !violations.is_empty() {
        eprintln!("\nBlocking I/O found in production code:");
        for violation in &violations {
            eprintln!("  {violation}");
        }
        eprintln!("\nFORBIDDEN: {}", BLOCKING_PATTERNS.join(", "));
        panic!("Found {} blocking I/O violation(s)", violations.len());
    }
}
