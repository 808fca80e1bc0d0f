//! `WorkerTransport`/`AggregatorTransport`: the two halves of the worker<->aggregator
//! channel (spec §4.5). The one-in-flight-per-worker send discipline is enforced by
//! the caller (`photon-fabric`'s worker loop), not by the transport itself — these
//! traits only guarantee that a single `send_data` completes before returning.

use crate::message::Envelope;
use async_trait::async_trait;
use photon_core::{PhotonError, Rank, RecordMap};

/// The worker side of the channel: send `DATA`, poll for `DIE`, send `DEAD`.
#[async_trait]
pub trait WorkerTransport: Send {
    /// Sends a reduced payload to the aggregator. Completes only once the payload
    /// has left this transport (handed to the OS socket buffer or local queue).
    async fn send_data(&mut self, payload: RecordMap) -> Result<(), PhotonError>;

    /// Sends the `END` sentinel, marking this worker's last emission.
    async fn send_end(&mut self) -> Result<(), PhotonError>;

    /// Non-blocking check for a pending `DIE` control message. Per spec §4.5, the
    /// worker loop polls this before opening each new event, not at every await
    /// point.
    fn poll_die(&mut self) -> bool;

    /// Confirms a `DIE` was honored.
    async fn send_dead(&mut self) -> Result<(), PhotonError>;
}

/// The aggregator side of the channel: receive from any worker, send `DIE` to one.
#[async_trait]
pub trait AggregatorTransport: Send {
    /// Blocks until the next envelope from any worker arrives, or returns `Ok(None)`
    /// once every worker's sender half has been dropped (fail-stop: the aggregator
    /// is expected to still be waiting for `END`s, per spec §4.5's failure model,
    /// so a `None` here generally indicates every worker transport was torn down
    /// rather than a graceful end-of-stream).
    async fn recv(&mut self) -> Result<Option<Envelope>, PhotonError>;

    /// Sends `DIE` to the named worker, as part of the aggregator-initiated
    /// SHUTDOWN path.
    async fn send_die(&mut self, worker_rank: Rank) -> Result<(), PhotonError>;

    /// Total number of workers this transport was constructed to talk to.
    fn worker_count(&self) -> u32;
}
