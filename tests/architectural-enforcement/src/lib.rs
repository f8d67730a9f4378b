//! Architectural Enforcement
//!
//! Source scanners that keep the fortune teller honest about time and I/O:
//! - No thread sleeps anywhere in production code
//! - Async sleeps only inside the named timing helpers (motion holds and
//!   dramatic pauses), so every wait is visible and virtual-time testable
//! - No blocking network or HTTP clients
//!
//! The scanners are line based. They skip `//` comments and anything after
//! the first `#[cfg(test)]` in a file, where unit tests live.

use std::fs;
use std::path::{Path, PathBuf};

/// One rule violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// File the violation was found in
    pub file: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// Offending source line, trimmed
    pub text: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} - {}", self.file.display(), self.line, self.text)
    }
}

/// Where sleeping is tolerated
#[derive(Debug, Clone, Default)]
pub struct SleepPolicy {
    /// Functions allowed to call `tokio::time::sleep`
    pub timing_helpers: Vec<&'static str>,
}

impl SleepPolicy {
    /// Policy for the core crate: holds and pauses only
    #[must_use]
    pub fn core() -> Self {
        Self {
            timing_helpers: vec!["hold", "pause"],
        }
    }

    /// Policy allowing no sleeps at all
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }
}

/// Blocking APIs that must not appear in production code
pub const BLOCKING_PATTERNS: &[&str] = &[
    "reqwest::blocking",
    "std::net::TcpStream",
    "std::net::TcpListener",
    "std::process::Command",
    "std::thread::spawn",
    "std::io::stdin",
    "std::io::stdout",
];

/// Workspace root, derived from this package's manifest directory
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// Every `.rs` file under `dir`
#[must_use]
pub fn rust_files(dir: &Path) -> Vec<PathBuf> {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// Production lines of a source file, paired with 1-based line numbers
fn production_lines(content: &str) -> Vec<(usize, &str)> {
    content
        .lines()
        .enumerate()
        .take_while(|(_, line)| line.trim() != "#[cfg(test)]")
        .map(|(idx, line)| (idx + 1, line))
        .collect()
}

/// Name of the function enclosing line `idx`, if any
fn enclosing_fn<'a>(lines: &[(usize, &'a str)], idx: usize) -> Option<&'a str> {
    lines[..=idx].iter().rev().find_map(|(_, line)| {
        let line = line.trim_start();
        let at = line.find("fn ")?;
        // Require "fn " to start a declaration, not sit inside an identifier.
        if at > 0 && !line[..at].ends_with(' ') {
            return None;
        }
        let rest = &line[at + 3..];
        let end = rest.find(|c: char| !(c.is_alphanumeric() || c == '_'))?;
        Some(&rest[..end])
    })
}

/// Find sleep violations in one file's contents
#[must_use]
pub fn scan_sleeps(file: &Path, content: &str, policy: &SleepPolicy) -> Vec<Violation> {
    let lines = production_lines(content);
    let mut violations = Vec::new();

    for (idx, (number, line)) in lines.iter().enumerate() {
        let code = line.split("//").next().unwrap_or(line);
        if !(code.contains("::sleep(") || code.contains(".sleep(")) {
            continue;
        }

        let allowed = code.contains("tokio::time::sleep(")
            && enclosing_fn(&lines, idx).is_some_and(|name| policy.timing_helpers.contains(&name));
        if !allowed {
            violations.push(Violation {
                file: file.to_path_buf(),
                line: *number,
                text: line.trim().to_string(),
            });
        }
    }
    violations
}

/// Find blocking I/O in one file's contents
#[must_use]
pub fn scan_blocking(file: &Path, content: &str) -> Vec<Violation> {
    production_lines(content)
        .into_iter()
        .filter(|(_, line)| {
            let code = line.split("//").next().unwrap_or(line);
            BLOCKING_PATTERNS.iter().any(|p| code.contains(p))
        })
        .map(|(number, line)| Violation {
            file: file.to_path_buf(),
            line: number,
            text: line.trim().to_string(),
        })
        .collect()
}

/// Apply `scan` to every Rust file under `dir`
pub fn scan_dir<F>(dir: &Path, mut scan: F) -> Vec<Violation>
where
    F: FnMut(&Path, &str) -> Vec<Violation>,
{
    rust_files(dir)
        .into_iter()
        .filter_map(|path| {
            let content = fs::read_to_string(&path).ok()?;
            Some(scan(&path, &content))
        })
        .flatten()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file() -> PathBuf {
        PathBuf::from("sample.rs")
    }

    #[test]
    fn test_thread_sleep_is_flagged() {
        let code = "fn hold() {\n    std::thread::sleep(d);\n}\n";
        let found = scan_sleeps(&file(), code, &SleepPolicy::core());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].line, 2);
    }

    #[test]
    fn test_tokio_sleep_in_helper_allowed() {
        let code = "pub(crate) async fn hold(d: Duration) {\n    if !d.is_zero() {\n        tokio::time::sleep(d).await;\n    }\n}\n";
        assert!(scan_sleeps(&file(), code, &SleepPolicy::core()).is_empty());
    }

    #[test]
    fn test_tokio_sleep_elsewhere_flagged() {
        let code = "async fn speak() {\n    tokio::time::sleep(d).await;\n}\n";
        assert_eq!(scan_sleeps(&file(), code, &SleepPolicy::core()).len(), 1);
        let helper = "async fn hold() {\n    tokio::time::sleep(d).await;\n}\n";
        assert_eq!(scan_sleeps(&file(), helper, &SleepPolicy::none()).len(), 1);
    }

    #[test]
    fn test_comments_and_unit_tests_skipped() {
        let code = "fn a() {\n    // std::thread::sleep(d)\n}\n#[cfg(test)]\nmod tests {\n    fn t() { std::thread::sleep(d); }\n}\n";
        assert!(scan_sleeps(&file(), code, &SleepPolicy::none()).is_empty());
    }

    #[test]
    fn test_blocking_client_flagged() {
        let code = "use reqwest::blocking::Client;\nuse reqwest::Client as Async;\n";
        let found = scan_blocking(&file(), code);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].to_string(), "sample.rs:1 - use reqwest::blocking::Client;");
    }

    #[test]
    fn test_std_console_flagged_tokio_console_allowed() {
        let code = "let out = tokio::io::stdout();\nlet out = std::io::stdout();\n";
        let found = scan_blocking(&file(), code);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].line, 2);
    }

    #[test]
    fn test_enclosing_fn_ignores_identifiers() {
        let lines = vec![(1, "async fn pause(&self) {"), (2, "    let left = 1;")];
        assert_eq!(enclosing_fn(&lines, 1), Some("pause"));
    }
}
