//! Subcommand implementations.

pub mod transform;
pub mod version;
