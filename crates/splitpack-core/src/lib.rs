#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

pub mod config;
pub mod error;
pub mod request;
pub mod resolve;
pub mod transform;

pub use config::{parse_define, resolve_config, TransformConfig};
pub use error::Error;
pub use request::{ChunkDescriptor, DependencyRequest, ModuleId, RequestKind};
pub use resolve::{IdAllocator, ImportResolver, ModuleRegistry, ResolveError, SequentialIds};
pub use transform::{
    codes, transform, ReplacementTable, SourceFile, TransformError, TransformResult, Transformer,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
