#![allow(clippy::multiple_crate_versions)]
//! Configuration layer: a YAML document parsed into a group -> key -> value tree,
//! with typed accessors that enforce presence and type, plus typed structs for the
//! three top-level groups the fabric reads at startup.

pub mod error;
pub mod tree;
pub mod typed;

pub use error::ConfigError;
pub use tree::ConfigTree;
pub use typed::{DataRetrievalConfig, LclsExtra, LclsExtraKind, ParallelizationConfig};
