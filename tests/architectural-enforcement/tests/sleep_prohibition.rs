//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code never blocks a thread to wait. Motion holds
//! and dramatic pauses are the only places allowed to await a timer.

use architectural_enforcement::{scan_dir, scan_sleeps, workspace_root, SleepPolicy};

#[test]
fn test_no_sleep_outside_timing_helpers() {
    let root = workspace_root();
    let core = root.join("oracle/core/src");
    let cli = root.join("oracle/cli/src");
    assert!(core.exists(), "missing {}", core.display());

    let mut violations = scan_dir(&core, |path, content| {
        scan_sleeps(path, content, &SleepPolicy::core())
    });
    violations.extend(scan_dir(&cli, |path, content| {
        scan_sleeps(path, content, &SleepPolicy::none())
    }));

    if !violations.is_empty() {
        eprintln!("\nSleep calls found in production code:");
        for violation in &violations {
            eprintln!("  {violation}");
        }
        eprintln!("\nACCEPTABLE: tokio::time::sleep inside `hold` or `pause`");
        eprintln!("FORBIDDEN: std::thread::sleep, or timers anywhere else");
        panic!("Found {} sleep violation(s)", violations.len());
    }
}
