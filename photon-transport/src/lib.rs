#![allow(clippy::multiple_crate_versions)]
//! The worker<->aggregator wire protocol (spec §4.5, §6): `DATA`/`DIE`/`DEAD`
//! envelopes carried over either an in-process channel (default single-process
//! run, and test tooling) or TCP (real multi-process deployment).

pub mod in_process;
pub mod message;
pub mod tcp;
pub mod transport;

pub use in_process::{in_process_pool, InProcessAggregatorTransport, InProcessWorkerTransport};
pub use message::Envelope;
pub use tcp::{TcpAggregatorTransport, TcpWorkerTransport};
pub use transport::{AggregatorTransport, WorkerTransport};
