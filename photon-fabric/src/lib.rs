#![allow(clippy::multiple_crate_versions)]
//! The parallelization fabric (spec §4.5): the aggregator and worker state
//! machines, plus the top-level orchestration that wires a configured
//! `EventSource`, `Processor`, `Transport` and `BroadcastChannel` together into
//! one run.

pub mod aggregator;
pub mod run;
pub mod worker;

pub use aggregator::{run_aggregator, AggregatorOutcome};
pub use run::{run, RunConfig, RunReport};
pub use worker::{run_worker, WorkerOutcome};
