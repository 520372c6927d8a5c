//! Shared tooling for the conformance runners: fixture discovery, `.dat`
//! record parsing, `.test` JSON models, and line diffing.

pub mod dat;
pub mod json;

use std::path::{Path, PathBuf};

/// Root of an `html5lib-tests` checkout, from the `HTML5LIB_TESTS` env var.
/// Runners pass vacuously when it is unset.
pub fn fixture_root() -> Option<PathBuf> {
    let root = std::env::var_os("HTML5LIB_TESTS")?;
    let root = PathBuf::from(root);
    root.is_dir().then_some(root)
}

/// Case-name filter from `HTML5_FIXTURE_FILTER` (substring match).
pub fn fixture_filter() -> Option<String> {
    std::env::var("HTML5_FIXTURE_FILTER").ok().filter(|s| !s.is_empty())
}

/// All files with `extension` directly inside `dir`, sorted by name.
pub fn list_files(dir: &Path, extension: &str) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(extension))
        .collect();
    files.sort();
    files
}

/// Context-window diff of two line lists, for panic messages.
pub fn diff_lines(expected: &[String], actual: &[String]) -> String {
    use std::fmt::Write;
    let max = expected.len().max(actual.len());
    let missing = "<missing>";
    let mut out = String::new();
    let mismatch = (0..max).find(|&i| {
        expected.get(i).map(String::as_str).unwrap_or(missing)
            != actual.get(i).map(String::as_str).unwrap_or(missing)
    });
    if let Some(i) = mismatch {
        let start = i.saturating_sub(2);
        let end = (i + 3).min(max);
        let _ = writeln!(
            &mut out,
            "first mismatch at line {} (showing {}..={}):",
            i + 1,
            start + 1,
            end
        );
        for line_idx in start..end {
            let left = expected.get(line_idx).map(String::as_str).unwrap_or(missing);
            let right = actual.get(line_idx).map(String::as_str).unwrap_or(missing);
            let marker = if line_idx == i { ">" } else { " " };
            let _ = writeln!(&mut out, "{marker} {:>4}  expected: {left}", line_idx + 1);
            let _ = writeln!(&mut out, "{marker} {:>4}    actual: {right}", line_idx + 1);
        }
    }
    let _ = writeln!(
        &mut out,
        "expected {} lines, actual {} lines",
        expected.len(),
        actual.len()
    );
    out
}

#[cfg(test)]
mod tests {
    use super::diff_lines;

    #[test]
    fn diff_points_at_the_first_mismatch() {
        let expected = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let actual = vec!["a".to_string(), "x".to_string(), "c".to_string()];
        let out = diff_lines(&expected, &actual);
        assert!(out.contains("first mismatch at line 2"));
        assert!(out.contains("expected: b"));
        assert!(out.contains("actual: x"));
    }

    #[test]
    fn diff_reports_length_divergence() {
        let expected = vec!["a".to_string()];
        let actual = vec!["a".to_string(), "b".to_string()];
        let out = diff_lines(&expected, &actual);
        assert!(out.contains("expected 1 lines, actual 2 lines"));
    }
}
