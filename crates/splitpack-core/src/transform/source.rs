//! Input file description for the transform stage.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Syntax dialect flags handed to the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Dialect {
    /// Type annotations (TypeScript).
    #[serde(default)]
    pub typescript: bool,
    /// JSX elements.
    #[serde(default)]
    pub jsx: bool,
}

impl Dialect {
    /// Plain ECMAScript.
    pub const PLAIN: Self = Self {
        typescript: false,
        jsx: false,
    };

    /// Determine the dialect from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "ts" | "mts" | "cts" => Self {
                typescript: true,
                jsx: false,
            },
            "tsx" => Self {
                typescript: true,
                jsx: true,
            },
            "jsx" => Self {
                typescript: false,
                jsx: true,
            },
            _ => Self::PLAIN,
        }
    }

    #[must_use]
    pub fn with_jsx(mut self, jsx: bool) -> Self {
        self.jsx = jsx;
        self
    }
}

/// One source file to transform. Read-only for the stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute path (used for resolution and source maps).
    pub path: PathBuf,
    /// Raw file text.
    pub text: String,
    /// Dialect flags.
    pub dialect: Dialect,
}

impl SourceFile {
    /// Create a source file, deriving the dialect from the extension.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let path = path.into();
        let dialect = Dialect::from_path(&path);
        Self {
            path,
            text: text.into(),
            dialect,
        }
    }

    /// Override the dialect flags.
    #[must_use]
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Read a file from disk.
    pub fn read(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let text = std::fs::read_to_string(&path)?;
        Ok(Self::new(path, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_from_extension() {
        assert_eq!(Dialect::from_path(Path::new("a.js")), Dialect::PLAIN);
        assert_eq!(Dialect::from_path(Path::new("a.mjs")), Dialect::PLAIN);
        assert!(Dialect::from_path(Path::new("a.jsx")).jsx);
        assert!(!Dialect::from_path(Path::new("a.jsx")).typescript);
        assert!(Dialect::from_path(Path::new("a.ts")).typescript);
        assert!(Dialect::from_path(Path::new("a.cts")).typescript);
        let tsx = Dialect::from_path(Path::new("App.TSX"));
        assert!(tsx.typescript && tsx.jsx);
    }

    #[test]
    fn test_unknown_extension_is_plain() {
        assert_eq!(Dialect::from_path(Path::new("README")), Dialect::PLAIN);
        assert_eq!(Dialect::from_path(Path::new("a.vue")), Dialect::PLAIN);
    }

    #[test]
    fn test_with_dialect_overrides() {
        let file = SourceFile::new("/src/a.js", "x")
            .with_dialect(Dialect::PLAIN.with_jsx(true));
        assert!(file.dialect.jsx);
        assert!(!file.dialect.typescript);
    }
}
