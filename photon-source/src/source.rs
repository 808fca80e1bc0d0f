//! The `EventSource` external contract (spec §4.1).

use crate::event::Event;
use async_trait::async_trait;
use futures::stream::BoxStream;
use photon_core::{PhotonError, Rank};

/// A lazy, finite (or, for online sources, effectively infinite) sequence of
/// [`Event`]s. Iterator-level errors are fatal to the worker that produced them and
/// surface as a stream item rather than panicking the stream.
pub type EventStream = BoxStream<'static, Result<Event, PhotonError>>;

/// Produces, opens and closes events for one worker.
///
/// Implementations are selected by a stable string identifier through
/// [`SourceRegistry`](crate::SourceRegistry) (`"pilatus-files"`, `"jungfrau1m-files"`,
/// `"eiger16m-files"`, `"psana"`, …).
#[async_trait]
pub trait EventSource: Send + Sync {
    /// One-time setup before any events are produced. Fails with
    /// [`PhotonError::Config`] on malformed parameters.
    async fn initialize(&mut self, rank: Rank, pool_size: u32) -> Result<(), PhotonError>;

    /// Returns this worker's slice of the event stream.
    ///
    /// Offline sources must partition the underlying stream with approximately
    /// equal counts per worker (see [`crate::files::partition_range`]); online
    /// sources are exempt and simply yield whatever the facility delivers locally.
    fn events(&self, rank: Rank, pool_size: u32) -> EventStream;

    /// Acquires per-event resources (file handles, detector buffers). Must be
    /// paired with exactly one [`close`](Self::close) call, on every control-flow
    /// path that reached `open`, including error paths.
    async fn open(&self, event: &mut Event) -> Result<(), PhotonError>;

    /// Releases per-event resources acquired by [`open`](Self::open).
    async fn close(&self, event: &mut Event) -> Result<(), PhotonError>;

    /// Number of frames contained in `event`. Always positive for events that
    /// reached `open` successfully.
    fn num_frames(&self, event: &Event) -> usize;
}
