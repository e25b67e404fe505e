//! Resolution and identifier-allocation capabilities used by the transform.
//!
//! The transform never decides how a request maps to a file. It hands every
//! discovered request to an [`ImportResolver`] and writes back whatever
//! identifier comes out. Chunk names that are not given explicitly come from
//! an [`IdAllocator`].
//!
//! Both traits are `Send + Sync` so one instance can back many transforms
//! running in parallel.

use crate::request::ModuleId;
use rustc_hash::FxHashMap as HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

/// Failure to turn a request into an identifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Cannot find module '{request}' from {}", from.display())]
    NotFound { request: String, from: PathBuf },

    #[error("Cannot record module '{request}': {reason}")]
    Rejected { request: String, reason: String },
}

/// Turns a raw request into an opaque identifier.
pub trait ImportResolver: Send + Sync {
    /// Record `request` made by the file at `from` and return its identifier.
    fn import_request(&self, request: &str, from: &Path) -> Result<ModuleId, ResolveError>;
}

impl<F> ImportResolver for F
where
    F: Fn(&str, &Path) -> Result<ModuleId, ResolveError> + Send + Sync,
{
    fn import_request(&self, request: &str, from: &Path) -> Result<ModuleId, ResolveError> {
        self(request, from)
    }
}

/// Hands out build-wide unique tokens.
pub trait IdAllocator: Send + Sync {
    fn next_unique_id(&self) -> u64;
}

/// Monotonic atomic counter.
#[derive(Debug)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new()
    }
}

impl SequentialIds {
    /// Counter starting at 1.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    #[must_use]
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }
}

impl IdAllocator for SequentialIds {
    fn next_unique_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

/// Resolver that numbers every distinct target it sees.
///
/// Relative and absolute requests are normalized against the requesting
/// file's directory; bare specifiers (`react`, `@scope/pkg/x`) are keyed as
/// written. The same target always gets the same id.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    inner: Mutex<RegistryInner>,
    check_exists: bool,
}

#[derive(Debug, Default)]
struct RegistryInner {
    ids: HashMap<String, u64>,
    targets: Vec<String>,
}

/// Extensions tried when `check_exists` is enabled and the request has none.
const PROBE_EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs", "ts", "tsx", "mts", "cts", "json"];

impl ModuleRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject relative/absolute requests that do not exist on disk, and key
    /// the ones that do on the canonical path of the file found.
    #[must_use]
    pub fn with_check_exists(mut self, check_exists: bool) -> Self {
        self.check_exists = check_exists;
        self
    }

    /// Number of distinct targets recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().targets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Target recorded for an id, if any.
    #[must_use]
    pub fn target(&self, id: u64) -> Option<String> {
        let index = usize::try_from(id).ok()?;
        self.lock().targets.get(index).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn target_key(&self, request: &str, from: &Path) -> Result<String, ResolveError> {
        if request.is_empty() {
            return Err(ResolveError::Rejected {
                request: request.to_string(),
                reason: "empty request".to_string(),
            });
        }

        if !is_path_request(request) {
            return Ok(request.to_string());
        }

        let base = from.parent().unwrap_or_else(|| Path::new("/"));
        let joined = normalize(&base.join(request));

        let target = if self.check_exists {
            let found = probe(&joined).ok_or_else(|| ResolveError::NotFound {
                request: request.to_string(),
                from: from.to_path_buf(),
            })?;
            dunce::canonicalize(&found).map_err(|e| ResolveError::Rejected {
                request: request.to_string(),
                reason: e.to_string(),
            })?
        } else {
            joined
        };

        Ok(target.to_string_lossy().replace('\\', "/"))
    }
}

impl ImportResolver for ModuleRegistry {
    fn import_request(&self, request: &str, from: &Path) -> Result<ModuleId, ResolveError> {
        let key = self.target_key(request, from)?;
        let mut inner = self.lock();
        if let Some(&id) = inner.ids.get(&key) {
            return Ok(ModuleId::Int(id));
        }
        let id = inner.targets.len() as u64;
        inner.targets.push(key.clone());
        inner.ids.insert(key, id);
        Ok(ModuleId::Int(id))
    }
}

fn is_path_request(request: &str) -> bool {
    matches!(request, "." | "..")
        || request.starts_with("./")
        || request.starts_with("../")
        || request.starts_with('/')
}

/// Lexically normalize a path (resolve `.` and `..` without touching disk).
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Find the file a path request refers to: as-is, with a known extension,
/// or as a directory index.
fn probe(path: &Path) -> Option<PathBuf> {
    if path.is_file() {
        return Some(path.to_path_buf());
    }
    for ext in PROBE_EXTENSIONS {
        let mut candidate = path.as_os_str().to_owned();
        candidate.push(".");
        candidate.push(ext);
        let candidate = PathBuf::from(candidate);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    if path.is_dir() {
        for ext in PROBE_EXTENSIONS {
            let candidate = path.join(format!("index.{ext}"));
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_ids_are_monotonic() {
        let ids = SequentialIds::new();
        assert_eq!(ids.next_unique_id(), 1);
        assert_eq!(ids.next_unique_id(), 2);
        assert_eq!(ids.next_unique_id(), 3);
    }

    #[test]
    fn test_sequential_ids_unique_across_threads() {
        let ids = SequentialIds::starting_at(100);
        let mut all: Vec<u64> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| (0..50).map(|_| ids.next_unique_id()).collect::<Vec<_>>()))
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 200);
        assert_eq!(all[0], 100);
    }

    #[test]
    fn test_registry_dedups_same_target() {
        let registry = ModuleRegistry::new();
        let a = registry
            .import_request("./util", Path::new("/app/src/a.js"))
            .unwrap();
        let b = registry
            .import_request("../src/util", Path::new("/app/lib/b.js"))
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.target(0).as_deref(), Some("/app/src/util"));
    }

    #[test]
    fn test_registry_keeps_bare_specifiers() {
        let registry = ModuleRegistry::new();
        let react = registry
            .import_request("react", Path::new("/app/src/a.js"))
            .unwrap();
        let local = registry
            .import_request("./react", Path::new("/app/src/a.js"))
            .unwrap();
        assert_ne!(react, local);
        assert_eq!(registry.target(0).as_deref(), Some("react"));
    }

    #[test]
    fn test_registry_rejects_empty_request() {
        let registry = ModuleRegistry::new();
        let err = registry
            .import_request("", Path::new("/app/a.js"))
            .unwrap_err();
        assert!(matches!(err, ResolveError::Rejected { .. }));
    }

    #[test]
    fn test_registry_check_exists() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("present.ts"), "export {}").unwrap();
        std::fs::create_dir(dir.path().join("pkg")).unwrap();
        std::fs::write(dir.path().join("pkg").join("index.js"), "").unwrap();
        let from = dir.path().join("entry.js");

        let registry = ModuleRegistry::new().with_check_exists(true);
        let present = registry.import_request("./present", &from).unwrap();
        let pkg = registry.import_request("./pkg", &from).unwrap();
        // Spellings of the same file share one id.
        assert_eq!(registry.import_request("./present.ts", &from).unwrap(), present);
        assert_eq!(registry.import_request("./pkg/index.js", &from).unwrap(), pkg);
        assert_eq!(registry.import_request("./pkg/../present", &from).unwrap(), present);
        assert_eq!(registry.len(), 2);
        let err = registry.import_request("./missing", &from).unwrap_err();
        assert!(matches!(err, ResolveError::NotFound { .. }));
        // Bare specifiers are never probed.
        assert!(registry.import_request("lodash", &from).is_ok());
    }

    #[test]
    fn test_closure_resolver() {
        let resolver =
            |request: &str, _from: &Path| Ok::<_, ResolveError>(ModuleId::from(request.to_uppercase()));
        let id = resolver
            .import_request("./a", Path::new("/x.js"))
            .unwrap();
        assert_eq!(id, ModuleId::from("./A"));
    }
}
