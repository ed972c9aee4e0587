//! Error types for template compilation and rendering.
//!
//! The taxonomy is small and closed:
//!
//! - [`Error::Parse`] - fatal at compile time, raised only for a start tag
//!   with no matching end tag.
//! - [`Error::IncludeSyntax`] - a malformed `include` directive; detected at
//!   compile time but raised when the instruction executes.
//! - [`Error::Eval`] - any failure evaluating an embedded expression, filter,
//!   or statement at render time.
//! - [`Error::Io`] - reading a template file failed.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type for template operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Any failure produced while compiling or rendering a template.
#[derive(Debug, Error)]
pub enum Error {
    /// A start tag has no matching end tag. Fatal at compile time.
    #[error("unterminated tag: missing closing `{end}`{}", at(.file, .line))]
    Parse {
        /// The end tag that was expected.
        end: String,
        /// The file being compiled, if known.
        file: Option<PathBuf>,
        /// 1-based line of the unmatched start tag.
        line: u32,
    },

    /// A malformed `include` directive. Raised when the instruction runs.
    #[error("malformed include directive `{directive}`{}", at(.file, .line))]
    IncludeSyntax {
        /// The offending instruction text.
        directive: String,
        file: Option<PathBuf>,
        line: u32,
    },

    /// An embedded expression, filter, or statement failed at render time.
    #[error("{message}{}", at_opt(.file, .line))]
    Eval {
        message: String,
        file: Option<PathBuf>,
        line: Option<u32>,
    },

    /// Reading a template file failed.
    #[error("failed to read template `{}`", .path.display())]
    Io {
        /// The path that could not be read.
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Returns the source position this error points at, if one is known.
    pub fn position(&self) -> Option<(&Path, u32)> {
        match self {
            Self::Parse { file, line, .. } | Self::IncludeSyntax { file, line, .. } => {
                file.as_deref().map(|f| (f, *line))
            }
            Self::Eval { file, line, .. } => match (file, line) {
                (Some(f), Some(l)) => Some((f.as_path(), *l)),
                _ => None,
            },
            Self::Io { .. } => None,
        }
    }
}

/// Formats a ` at file:line` / ` at line N` suffix for error display.
fn at(file: &Option<PathBuf>, line: &u32) -> String {
    match file {
        Some(file) => format!(" at {}:{}", file.display(), line),
        None => format!(" at line {line}"),
    }
}

fn at_opt(file: &Option<PathBuf>, line: &Option<u32>) -> String {
    match (file, line) {
        (Some(file), Some(line)) => format!(" at {}:{}", file.display(), line),
        (Some(file), None) => format!(" at {}", file.display()),
        (None, Some(line)) => format!(" at line {line}"),
        (None, None) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_display_names_tag_and_position() {
        let err = Error::Parse {
            end: "%>".to_string(),
            file: Some(PathBuf::from("page.html")),
            line: 7,
        };
        let msg = err.to_string();
        assert!(msg.contains("missing closing `%>`"));
        assert!(msg.contains("page.html:7"));
    }

    #[test]
    fn eval_error_without_file_shows_line_only() {
        let err = Error::Eval {
            message: "`user` is not defined".to_string(),
            file: None,
            line: Some(3),
        };
        assert_eq!(err.to_string(), "`user` is not defined at line 3");
        assert!(err.position().is_none());
    }

    #[test]
    fn position_requires_both_file_and_line() {
        let err = Error::Eval {
            message: "boom".to_string(),
            file: Some(PathBuf::from("a.html")),
            line: Some(2),
        };
        let (file, line) = err.position().unwrap();
        assert_eq!(file, Path::new("a.html"));
        assert_eq!(line, 2);
    }
}
