#![allow(clippy::multiple_crate_versions)]
//! The `BroadcastChannel` contract (spec §4.4): a hot, best-effort pub/sub
//! fan-out from the aggregator to zero or more GUI subscribers, in-process or
//! over TCP.

pub mod subject;
pub mod tcp;

pub use subject::{BroadcastChannel, Published, Subscription};
pub use tcp::{serve, DEFAULT_ENDPOINT};
