//! Per-file transform stage.
//!
//! Parses one source file, walks the tree once to find and rewrite every
//! dependency reference, and prints the result with a source map.
//!
//! ## Pipeline
//!
//! 1. **Parse** - SWC builds a module tree; any parse error is fatal.
//! 2. **Rewrite** - one depth-first pass records imports and `require`
//!    calls, extracts `require.ensure` chunks and applies defines.
//! 3. **Emit** - SWC prints code plus a version 3 source map.
//!
//! ## Usage
//!
//! ```ignore
//! use splitpack_core::transform::{SourceFile, Transformer};
//! use splitpack_core::{ModuleRegistry, SequentialIds};
//!
//! let transformer = Transformer::new(ModuleRegistry::new(), SequentialIds::new());
//! let file = SourceFile::new("/app/src/index.js", "import a from './a';");
//! let result = transformer.transform(&file)?;
//! println!("{}", result.contents);
//! ```

mod chunks;
pub mod classify;
pub mod diagnostic;
pub mod replace;
mod rewrite;
pub mod scope;
pub mod source;
pub(crate) mod swc;

pub use classify::{CallKind, CallReference};
pub use diagnostic::{codes, FileDiagnostic, LocatedDiagnostic, Severity, TransformError};
pub use replace::ReplacementTable;
pub use scope::{BindingKind, Frame, ScopeChain};
pub use source::{Dialect, SourceFile};

use crate::config::TransformConfig;
use crate::error::Error;
use crate::request::{ChunkDescriptor, DependencyRequest};
use crate::resolve::{IdAllocator, ImportResolver};
use rayon::prelude::*;
use rewrite::Rewriter;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use swc_common::{Globals, GLOBALS};
use swc_ecma_visit::VisitMutWith;
use tracing::debug;

/// Output of one file's transform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransformResult {
    /// Requests found by the outer pass, in traversal order.
    pub imports: Vec<DependencyRequest>,
    /// One descriptor per extracted `require.ensure` call.
    pub chunks: Vec<ChunkDescriptor>,
    /// Rewritten code.
    pub contents: String,
    /// Source map as JSON text, when requested.
    pub source_map: Option<String>,
}

/// Transform one file.
///
/// Every failure is a [`TransformError`]; no partial result is returned.
pub fn transform(
    file: &SourceFile,
    resolver: &dyn ImportResolver,
    ids: &dyn IdAllocator,
    replacements: &ReplacementTable,
    source_maps: bool,
) -> Result<TransformResult, TransformError> {
    GLOBALS.set(&Globals::default(), || {
        let mut parsed = swc::parse_module(file)?;

        let mut rewriter = Rewriter::new(&file.path, resolver, ids, replacements);
        parsed.module.visit_mut_with(&mut rewriter);
        let (imports, chunks) = rewriter.finish()?;

        let emitted = swc::emit(parsed, file, source_maps)?;

        debug!(
            file = %file.path.display(),
            imports = imports.len(),
            chunks = chunks.len(),
            "transformed"
        );

        Ok(TransformResult {
            imports,
            chunks,
            contents: emitted.code,
            source_map: emitted.source_map,
        })
    })
}

/// Shared collaborators for transforming many files.
///
/// Cloning is cheap; every clone shares the same resolver, allocator and
/// replacement table.
#[derive(Clone)]
pub struct Transformer {
    resolver: Arc<dyn ImportResolver>,
    ids: Arc<dyn IdAllocator>,
    replacements: Arc<ReplacementTable>,
    source_maps: bool,
}

impl fmt::Debug for Transformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transformer")
            .field("replacements", &self.replacements.len())
            .field("source_maps", &self.source_maps)
            .finish_non_exhaustive()
    }
}

impl Transformer {
    /// Create a transformer with no replacements and source maps on.
    pub fn new(
        resolver: impl ImportResolver + 'static,
        ids: impl IdAllocator + 'static,
    ) -> Self {
        Self::from_shared(Arc::new(resolver), Arc::new(ids))
    }

    /// Create a transformer over collaborators the caller keeps a handle to.
    #[must_use]
    pub fn from_shared(resolver: Arc<dyn ImportResolver>, ids: Arc<dyn IdAllocator>) -> Self {
        Self {
            resolver,
            ids,
            replacements: Arc::new(ReplacementTable::new()),
            source_maps: true,
        }
    }

    /// Create a transformer configured from a [`TransformConfig`].
    pub fn from_config(
        config: &TransformConfig,
        resolver: Arc<dyn ImportResolver>,
        ids: Arc<dyn IdAllocator>,
    ) -> Result<Self, Error> {
        Ok(Self::from_shared(resolver, ids)
            .with_replacements(ReplacementTable::from_config(config)?)
            .with_source_maps(config.source_maps))
    }

    pub fn with_replacements(mut self, replacements: ReplacementTable) -> Self {
        self.replacements = Arc::new(replacements);
        self
    }

    pub fn with_source_maps(mut self, source_maps: bool) -> Self {
        self.source_maps = source_maps;
        self
    }

    #[must_use]
    pub fn replacements(&self) -> &ReplacementTable {
        &self.replacements
    }

    pub fn transform(&self, file: &SourceFile) -> Result<TransformResult, TransformError> {
        transform(
            file,
            self.resolver.as_ref(),
            self.ids.as_ref(),
            &self.replacements,
            self.source_maps,
        )
    }

    /// Transform files in parallel. Results come back in input order.
    #[must_use]
    pub fn transform_all(
        &self,
        files: &[SourceFile],
    ) -> Vec<Result<TransformResult, TransformError>> {
        files.par_iter().map(|file| self.transform(file)).collect()
    }
}
