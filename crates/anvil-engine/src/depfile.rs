//! Dependency-record files
//!
//! Compilers emit per-unit dependency records in make syntax
//! (`out.o: src.cpp header.h \` with line continuations). The scheduler
//! parses the latest record each run and treats its entries as transient
//! extra producers of the owning target; the declared graph is never
//! mutated. A missing record never fails a build, it only marks the owning
//! target stale.

use crate::error::{EngineError, EngineResult};
use std::path::{Path, PathBuf};

/// Parse a dependency record, returning the prerequisites in order.
///
/// Handles backslash-newline continuations, escaped spaces in paths, and
/// multiple rules in one file. Rule targets (left of `:`) are ignored;
/// duplicates are dropped.
pub fn parse_depfile(content: &str) -> Vec<PathBuf> {
    let joined = content.replace("\\\r\n", " ").replace("\\\n", " ");

    let mut deps: Vec<PathBuf> = Vec::new();
    for line in joined.lines() {
        let prereqs = match line.find(':') {
            Some(idx) => &line[idx + 1..],
            None => continue,
        };
        for token in split_escaped(prereqs) {
            let path = PathBuf::from(token);
            if !deps.contains(&path) {
                deps.push(path);
            }
        }
    }
    deps
}

/// Split on whitespace, honoring `\ ` escapes within a path.
fn split_escaped(s: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&' ') => {
                current.push(' ');
                chars.next();
            }
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Read and parse a record file; `Ok(None)` when the file does not exist.
pub fn read_depfile(path: &Path) -> EngineResult<Option<Vec<PathBuf>>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(parse_depfile(&content))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(EngineError::io(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_simple_rule() {
        let deps = parse_depfile("out/a.o: src/a.cpp include/a.h\n");
        assert_eq!(deps, [PathBuf::from("src/a.cpp"), PathBuf::from("include/a.h")]);
    }

    #[test]
    fn test_continuations() {
        let deps = parse_depfile("out/a.o: src/a.cpp \\\n include/a.h \\\n include/b.h\n");
        assert_eq!(
            deps,
            [
                PathBuf::from("src/a.cpp"),
                PathBuf::from("include/a.h"),
                PathBuf::from("include/b.h"),
            ]
        );
    }

    #[test]
    fn test_escaped_spaces() {
        let deps = parse_depfile("out/a.o: src/my\\ file.cpp other.h\n");
        assert_eq!(
            deps,
            [PathBuf::from("src/my file.cpp"), PathBuf::from("other.h")]
        );
    }

    #[test]
    fn test_multiple_rules() {
        let deps = parse_depfile("a.o: a.cpp x.h\nb.o: b.cpp x.h\n");
        assert_eq!(
            deps,
            [
                PathBuf::from("a.cpp"),
                PathBuf::from("x.h"),
                PathBuf::from("b.cpp"),
            ]
        );
    }

    #[rstest]
    #[case("")]
    #[case("\n\n")]
    #[case("no colon here\n")]
    fn test_degenerate_inputs(#[case] content: &str) {
        assert!(parse_depfile(content).is_empty());
    }

    #[test]
    fn test_crlf_continuations() {
        let deps = parse_depfile("a.o: a.cpp \\\r\n x.h\r\n");
        assert_eq!(deps, [PathBuf::from("a.cpp"), PathBuf::from("x.h")]);
    }

    #[test]
    fn test_read_missing_is_none() {
        let result = read_depfile(Path::new("/nonexistent/a.o.d")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_read_existing() {
        let dir = tempfile::TempDir::new().unwrap();
        let record = dir.path().join("a.o.d");
        std::fs::write(&record, "a.o: a.cpp a.h\n").unwrap();
        let deps = read_depfile(&record).unwrap().unwrap();
        assert_eq!(deps.len(), 2);
    }
}
