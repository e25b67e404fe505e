//! Structured failures of the transform stage.
//!
//! Every failure leaving [`transform`](super::transform) has one of two
//! shapes: a [`LocatedDiagnostic`] when a source position is known, or a
//! [`FileDiagnostic`] scoped to the whole file.

use crate::resolve::ResolveError;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Stable error codes (SCREAMING_SNAKE_CASE).
pub mod codes {
    /// The input file could not be parsed.
    pub const TRANSFORM_SYNTAX_ERROR: &str = "TRANSFORM_SYNTAX_ERROR";
    /// A dependency request could not be turned into an identifier.
    pub const TRANSFORM_RESOLVE_ERROR: &str = "TRANSFORM_RESOLVE_ERROR";
    /// The rewritten tree could not be serialized.
    pub const TRANSFORM_EMIT_ERROR: &str = "TRANSFORM_EMIT_ERROR";
}

/// Diagnostic severity level. Every failure of this stage is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Error,
}

impl Severity {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
        }
    }
}

/// A failure pinned to a line and column of the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocatedDiagnostic {
    pub code: &'static str,
    pub file: PathBuf,
    /// Full text of the file the position refers to.
    #[serde(skip_serializing)]
    pub contents: String,
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed).
    pub column: u32,
    pub message: String,
    pub severity: Severity,
}

impl LocatedDiagnostic {
    /// The offending source line with a caret under the column.
    #[must_use]
    pub fn frame(&self) -> Option<String> {
        let index = usize::try_from(self.line.checked_sub(1)?).ok()?;
        let text = self.contents.lines().nth(index)?;
        let gutter = self.line.to_string();
        let pad = " ".repeat(gutter.len());
        let offset: String = text
            .chars()
            .take(self.column.saturating_sub(1) as usize)
            .map(|c| if c == '\t' { '\t' } else { ' ' })
            .collect();
        Some(format!("{gutter} | {text}\n{pad} | {offset}^"))
    }
}

impl fmt::Display for LocatedDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}[{}]: {}",
            self.file.display(),
            self.line,
            self.column,
            self.severity.as_str(),
            self.code,
            self.message
        )
    }
}

/// A failure without a usable source position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDiagnostic {
    pub code: &'static str,
    pub file: PathBuf,
    pub message: String,
    pub severity: Severity,
}

impl fmt::Display for FileDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}[{}]: {}",
            self.file.display(),
            self.severity.as_str(),
            self.code,
            self.message
        )
    }
}

/// Fatal failure of one file's transform.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum TransformError {
    #[error("{0}")]
    Located(LocatedDiagnostic),
    #[error("{0}")]
    File(FileDiagnostic),
}

impl TransformError {
    /// Syntax error at a known position.
    #[must_use]
    pub fn syntax_at(
        file: &Path,
        contents: &str,
        line: u32,
        column: u32,
        message: impl Into<String>,
    ) -> Self {
        Self::Located(LocatedDiagnostic {
            code: codes::TRANSFORM_SYNTAX_ERROR,
            file: file.to_path_buf(),
            contents: contents.to_string(),
            line,
            column,
            message: message.into(),
            severity: Severity::Error,
        })
    }

    /// Failure scoped to the whole file.
    #[must_use]
    pub fn in_file(code: &'static str, file: &Path, message: impl Into<String>) -> Self {
        Self::File(FileDiagnostic {
            code,
            file: file.to_path_buf(),
            message: message.into(),
            severity: Severity::Error,
        })
    }

    /// Resolution failure for `request`.
    #[must_use]
    pub fn resolve(file: &Path, error: &ResolveError) -> Self {
        Self::in_file(codes::TRANSFORM_RESOLVE_ERROR, file, error.to_string())
    }

    #[must_use]
    pub fn emit(file: &Path, message: impl Into<String>) -> Self {
        Self::in_file(codes::TRANSFORM_EMIT_ERROR, file, message)
    }

    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Located(d) => d.code,
            Self::File(d) => d.code,
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Located(d) => &d.message,
            Self::File(d) => &d.message,
        }
    }

    #[must_use]
    pub fn file(&self) -> &Path {
        match self {
            Self::Located(d) => &d.file,
            Self::File(d) => &d.file,
        }
    }

    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            Self::Located(d) => d.severity,
            Self::File(d) => d.severity,
        }
    }

    /// `(line, column)`, both 1-indexed, when known.
    #[must_use]
    pub fn location(&self) -> Option<(u32, u32)> {
        match self {
            Self::Located(d) => Some((d.line, d.column)),
            Self::File(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_located_display() {
        let err = TransformError::syntax_at(
            Path::new("src/app.js"),
            "let a = 1;\nlet b = 'x\n",
            2,
            9,
            "Unterminated string constant",
        );
        let display = err.to_string();
        assert!(display.starts_with("src/app.js:2:9: error[TRANSFORM_SYNTAX_ERROR]"));
        assert!(display.contains("Unterminated string constant"));
        assert_eq!(err.location(), Some((2, 9)));
    }

    #[test]
    fn test_frame_points_at_column() {
        let err = TransformError::syntax_at(Path::new("a.js"), "ab\ncd 'x\n", 2, 4, "boom");
        let TransformError::Located(diag) = err else {
            panic!("expected located diagnostic");
        };
        assert_eq!(diag.frame().unwrap(), "2 | cd 'x\n  |    ^");
    }

    #[test]
    fn test_frame_out_of_range() {
        let err = TransformError::syntax_at(Path::new("a.js"), "x", 5, 1, "boom");
        let TransformError::Located(diag) = err else {
            panic!("expected located diagnostic");
        };
        assert!(diag.frame().is_none());
    }

    #[test]
    fn test_resolve_error_is_file_scoped() {
        let err = TransformError::resolve(
            Path::new("/src/a.js"),
            &ResolveError::NotFound {
                request: "./missing".to_string(),
                from: PathBuf::from("/src/a.js"),
            },
        );
        assert_eq!(err.code(), codes::TRANSFORM_RESOLVE_ERROR);
        assert!(err.location().is_none());
        assert!(err.message().contains("./missing"));
        assert_eq!(err.severity(), Severity::Error);
    }

    #[test]
    fn test_serialize_omits_contents() {
        let err = TransformError::syntax_at(Path::new("a.js"), "secret", 1, 1, "boom");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["shape"], "located");
        assert_eq!(json["line"], 1);
        assert_eq!(json["severity"], "error");
        assert!(json.get("contents").is_none());
    }
}
