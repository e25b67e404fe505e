use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File name looked up by [`TransformConfig::discover`].
pub const CONFIG_FILE_NAME: &str = "splitpack.json";

/// Extensions handed to the transform stage by default.
pub const DEFAULT_EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs", "ts", "tsx", "mts", "cts"];

/// Configuration of the transform stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransformConfig {
    /// Replacement table: dotted name -> expression source.
    pub define: BTreeMap<String, String>,

    /// File extensions (without the dot) eligible for the transform.
    pub extensions: Vec<String>,

    /// Whether to produce source maps.
    pub source_maps: bool,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            define: BTreeMap::new(),
            extensions: DEFAULT_EXTENSIONS.iter().map(ToString::to_string).collect(),
            source_maps: true,
        }
    }
}

impl TransformConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a config file.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `splitpack.json` from `root` if present.
    pub fn discover(root: &Path) -> Result<Option<Self>, Error> {
        let path = root.join(CONFIG_FILE_NAME);
        if !path.is_file() {
            return Ok(None);
        }
        Self::load(&path).map(Some)
    }

    /// Add a define rule, replacing any rule with the same name.
    #[must_use]
    pub fn with_define(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.define.insert(name.into(), source.into());
        self
    }

    #[must_use]
    pub fn with_source_maps(mut self, source_maps: bool) -> Self {
        self.source_maps = source_maps;
        self
    }

    /// Merge `NAME=EXPRESSION` flags over the file's defines.
    pub fn merge_defines<I, S>(&mut self, defines: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for define in defines {
            let (name, source) = parse_define(define.as_ref())?;
            self.define.insert(name, source);
        }
        Ok(())
    }

    /// Whether a file should be handed to the transform at all.
    #[must_use]
    pub fn is_eligible(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }
}

/// Split a `NAME=EXPRESSION` flag.
pub fn parse_define(define: &str) -> Result<(String, String), Error> {
    let (name, source) = define
        .split_once('=')
        .ok_or_else(|| Error::InvalidDefine(define.to_string()))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidDefine(define.to_string()));
    }
    Ok((name.to_string(), source.trim().to_string()))
}

/// Resolve the config for a run: an explicit path wins, otherwise discovery
/// in `cwd`, otherwise defaults.
pub fn resolve_config(explicit: Option<&Path>, cwd: &Path) -> Result<TransformConfig, Error> {
    match explicit {
        Some(path) => TransformConfig::load(&absolutize(path, cwd)),
        None => Ok(TransformConfig::discover(cwd)?.unwrap_or_default()),
    }
}

fn absolutize(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}
