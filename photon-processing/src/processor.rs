//! The `Processor` contract: three responsibilities with distinct initialization
//! surfaces, per spec §4.3. The fabric treats every payload as opaque; only a
//! `Processor` and its companion GUI agree on payload schema.

use photon_core::{PhotonError, Rank, RecordMap, Tag};

/// Something a `Processor::collect` or `Processor::end_aggregator` call chose to
/// publish: a tag and the payload to broadcast under it.
pub type Published = (Tag, RecordMap);

/// Per-worker and aggregator reduction logic.
///
/// A single implementation plays both roles in a run: the fabric calls
/// `initialize_worker`/`process`/`end_worker` on ranks `1..pool_size`, and
/// `initialize_aggregator`/`collect`/`end_aggregator` on rank `0`. The Processor is
/// the sole component allowed to hold domain state; the fabric never inspects a
/// payload's contents.
pub trait Processor: Send {
    /// One-time setup on each worker (masks, calibration tables, geometry).
    fn initialize_worker(&mut self, rank: Rank, pool_size: u32) -> Result<(), PhotonError>;

    /// One-time setup on the aggregator (empty histograms, zeroed deques).
    fn initialize_aggregator(&mut self, rank: Rank, pool_size: u32) -> Result<(), PhotonError>;

    /// Transforms an extracted record into a reduced payload. Must be
    /// deterministic given the same inputs and worker state.
    fn process(
        &mut self,
        rank: Rank,
        pool_size: u32,
        record: RecordMap,
    ) -> Result<RecordMap, PhotonError>;

    /// Folds a payload received from `source_rank` into `AggregatorState`, and
    /// optionally decides to publish.
    fn collect(
        &mut self,
        rank: Rank,
        pool_size: u32,
        payload: RecordMap,
        source_rank: Rank,
    ) -> Result<Option<Published>, PhotonError>;

    /// Emitted once when a worker exhausts its event sequence. If non-empty, the
    /// fabric delivers it to the aggregator before the worker's `END` sentinel.
    fn end_worker(&mut self, rank: Rank, pool_size: u32) -> Result<Option<RecordMap>, PhotonError>;

    /// Final flush on the aggregator, executed exactly once after every worker has
    /// terminated.
    fn end_aggregator(
        &mut self,
        rank: Rank,
        pool_size: u32,
    ) -> Result<Option<Published>, PhotonError>;
}
