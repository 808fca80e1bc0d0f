#![allow(clippy::multiple_crate_versions)]
//! The `Processor` contract (spec §4.3) and three named implementations:
//! `crystallography`, `xes` and `cheetah`.

pub mod cheetah;
pub mod crystallography;
pub mod processor;
pub mod registry;
pub mod state;
pub mod xes;

pub use processor::{Processor, Published};
pub use registry::ProcessorRegistry;
pub use state::AggregatorState;
