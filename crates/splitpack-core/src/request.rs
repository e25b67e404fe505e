//! Dependency requests and chunk descriptors produced by the transform stage.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Opaque identifier assigned to a dependency by the resolution capability.
///
/// The string form (`Display`) is what gets written back into the tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModuleId {
    Int(u64),
    Str(String),
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Str(id) => f.write_str(id),
        }
    }
}

impl From<u64> for ModuleId {
    fn from(id: u64) -> Self {
        Self::Int(id)
    }
}

impl From<String> for ModuleId {
    fn from(id: String) -> Self {
        Self::Str(id)
    }
}

impl From<&str> for ModuleId {
    fn from(id: &str) -> Self {
        Self::Str(id.to_string())
    }
}

/// How a dependency reference was written in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestKind {
    /// `import x from "y"`
    StaticImport,
    /// `export * from "y"` / `export { x } from "y"`
    ReExport,
    /// `require("y")`
    CallRequire,
    /// `require.resolve("y")`
    CallResolve,
    /// An element of the `require.ensure([...])` entry array.
    RequireEnsureEntry,
    /// A call to the callback's require alias inside `require.ensure`.
    RequireEnsureNested,
    /// `module.hot.accept("y")`
    HotAccept,
    /// `module.hot.decline("y")`
    HotDecline,
}

impl RequestKind {
    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StaticImport => "static-import",
            Self::ReExport => "re-export",
            Self::CallRequire => "call-require",
            Self::CallResolve => "call-resolve",
            Self::RequireEnsureEntry => "require-ensure-entry",
            Self::RequireEnsureNested => "require-ensure-nested",
            Self::HotAccept => "hot-accept",
            Self::HotDecline => "hot-decline",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reference from a file to another, with its assigned identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRequest {
    /// Request string exactly as written (e.g. `./foo`).
    pub request: String,
    /// Path of the file making the request.
    pub from: PathBuf,
    /// Identifier assigned by the resolver.
    pub id: ModuleId,
    /// Syntactic form of the reference.
    pub kind: RequestKind,
}

impl DependencyRequest {
    #[must_use]
    pub fn new(
        request: impl Into<String>,
        from: impl Into<PathBuf>,
        id: ModuleId,
        kind: RequestKind,
    ) -> Self {
        Self {
            request: request.into(),
            from: from.into(),
            id,
            kind,
        }
    }
}

/// One code-split request (`require.ensure`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkDescriptor {
    /// Explicit name, or an allocator-issued token.
    pub name: String,
    /// Entry modules in array order.
    pub entries: Vec<DependencyRequest>,
    /// Requests made through the callback's require alias, in source order.
    pub nested: Vec<DependencyRequest>,
}

impl ChunkDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
            nested: Vec::new(),
        }
    }

    /// All requests of the chunk, entries first.
    pub fn requests(&self) -> impl Iterator<Item = &DependencyRequest> {
        self.entries.iter().chain(self.nested.iter())
    }
}
