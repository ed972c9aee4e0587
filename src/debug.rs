//! Source-context diagnostics for debug-mode renders.
//!
//! When a render fails at a known (file, line), this builds a report with a
//! window of two lines either side of the failing line, the failing line
//! marked with `>`, and right-aligned line numbers:
//!
//! ```text
//! `user` is not defined at /site/page.html:4
//!
//!   2 | <ul>
//!   3 |   <li>
//! > 4 |     <%= user.name %>
//!   5 |   </li>
//!   6 | </ul>
//! ```

use std::fs;

use crate::error::Error;

/// Lines of context either side of the failing line.
const CONTEXT: usize = 2;

/// Builds the report for a positioned failure, or `None` when the position
/// is unknown or the source cannot be read back.
pub fn source_context(err: &Error) -> Option<String> {
    let (file, line) = err.position()?;
    let source = fs::read_to_string(file).ok()?;
    Some(format_window(&err.to_string(), &source, line))
}

fn format_window(message: &str, source: &str, line: u32) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let line = line as usize;

    let first = line.saturating_sub(CONTEXT).max(1);
    let last = (line + CONTEXT).min(lines.len().max(1));
    let width = last.to_string().len();

    let mut report = format!("{message}\n\n");
    for n in first..=last {
        let marker = if n == line { '>' } else { ' ' };
        let text = lines.get(n - 1).copied().unwrap_or_default();
        report.push_str(&format!("{marker} {n:>width$} | {text}\n"));
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_marks_the_failing_line() {
        let source = "l1\nl2\nl3\nl4\nl5\nl6";
        let report = format_window("boom", source, 4);
        assert_eq!(
            report,
            "boom\n\n  2 | l2\n  3 | l3\n> 4 | l4\n  5 | l5\n  6 | l6\n"
        );
    }

    #[test]
    fn window_clamps_at_the_edges() {
        let source = "l1\nl2\nl3";
        let report = format_window("boom", source, 1);
        assert!(report.contains("> 1 | l1"));
        assert!(!report.contains("l4"));

        let report = format_window("boom", source, 3);
        assert!(report.contains("> 3 | l3"));
        assert!(report.contains("  1 | l1"));
    }

    #[test]
    fn line_numbers_right_align() {
        let source = (1..=12).map(|n| format!("l{n}")).collect::<Vec<_>>().join("\n");
        let report = format_window("boom", &source, 9);
        assert!(report.contains("   7 | l7"));
        assert!(report.contains(">  9 | l9"));
        assert!(report.contains("  11 | l11"));
    }
}
