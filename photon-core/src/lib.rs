#![allow(clippy::multiple_crate_versions)]
//! Shared vocabulary for the photon-fabric real-time monitor.
//!
//! This crate has no knowledge of event sources, processors, or transports: it only
//! defines the types and error taxonomy every other crate in the workspace builds on,
//! plus the runtime-agnostic [`CancellationToken`] used to drive the `DIE` control
//! signal through the fabric.

pub mod cancellation;
pub mod error;
pub mod record;

pub use cancellation::CancellationToken;
pub use error::{PhotonError, Result};
pub use record::{Rank, RecordMap, Tag};
