//! In-process `Transport` implementation backed by `tokio::sync::mpsc`, used by the
//! default single-process run and by integration tests (spec §8's test tooling).

use crate::message::Envelope;
use crate::transport::{AggregatorTransport, WorkerTransport};
use async_trait::async_trait;
use photon_core::{PhotonError, Rank, RecordMap};
use std::collections::HashMap;
use tokio::sync::mpsc;

const UPLINK_CAPACITY: usize = 256;
const DIE_CAPACITY: usize = 1;

/// Worker-side handle into an [`InProcessFabric`].
pub struct InProcessWorkerTransport {
    rank: Rank,
    uplink: mpsc::Sender<Envelope>,
    die: mpsc::Receiver<()>,
}

#[async_trait]
impl WorkerTransport for InProcessWorkerTransport {
    async fn send_data(&mut self, payload: RecordMap) -> Result<(), PhotonError> {
        self.uplink
            .send(Envelope::Data {
                worker_rank: self.rank,
                payload,
            })
            .await
            .map_err(|_| PhotonError::transport("aggregator uplink closed"))
    }

    async fn send_end(&mut self) -> Result<(), PhotonError> {
        self.uplink
            .send(Envelope::end(self.rank))
            .await
            .map_err(|_| PhotonError::transport("aggregator uplink closed"))
    }

    fn poll_die(&mut self) -> bool {
        matches!(self.die.try_recv(), Ok(()))
    }

    async fn send_dead(&mut self) -> Result<(), PhotonError> {
        self.uplink
            .send(Envelope::Dead {
                worker_rank: self.rank,
            })
            .await
            .map_err(|_| PhotonError::transport("aggregator uplink closed"))
    }
}

/// Aggregator-side handle into an [`InProcessFabric`].
pub struct InProcessAggregatorTransport {
    uplink_rx: mpsc::Receiver<Envelope>,
    die_tx: HashMap<Rank, mpsc::Sender<()>>,
}

#[async_trait]
impl AggregatorTransport for InProcessAggregatorTransport {
    async fn recv(&mut self) -> Result<Option<Envelope>, PhotonError> {
        Ok(self.uplink_rx.recv().await)
    }

    async fn send_die(&mut self, worker_rank: Rank) -> Result<(), PhotonError> {
        let sender = self.die_tx.get(&worker_rank).ok_or_else(|| {
            PhotonError::transport(format!("no such worker rank {worker_rank}"))
        })?;
        sender
            .send(())
            .await
            .map_err(|_| PhotonError::transport(format!("worker {worker_rank} die channel closed")))
    }

    fn worker_count(&self) -> u32 {
        self.die_tx.len() as u32
    }
}

/// Builds one [`InProcessAggregatorTransport`] and `pool_size - 1`
/// [`InProcessWorkerTransport`]s, one per worker rank `1..pool_size`, sharing a
/// single uplink and one DIE channel per worker.
#[must_use]
pub fn in_process_pool(
    pool_size: u32,
) -> (InProcessAggregatorTransport, Vec<InProcessWorkerTransport>) {
    let (uplink_tx, uplink_rx) = mpsc::channel(UPLINK_CAPACITY);
    let mut die_tx = HashMap::new();
    let mut workers = Vec::new();

    for rank in 1..pool_size {
        let rank = Rank(rank);
        let (tx, rx) = mpsc::channel(DIE_CAPACITY);
        die_tx.insert(rank, tx);
        workers.push(InProcessWorkerTransport {
            rank,
            uplink: uplink_tx.clone(),
            die: rx,
        });
    }

    (InProcessAggregatorTransport { uplink_rx, die_tx }, workers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn data_and_end_arrive_at_the_aggregator() {
        let (mut aggregator, mut workers) = in_process_pool(2);
        let mut worker = workers.remove(0);

        worker.send_data(RecordMap::new()).await.unwrap();
        worker.send_end().await.unwrap();

        let first = aggregator.recv().await.unwrap().unwrap();
        assert!(matches!(first, Envelope::Data { .. }));
        assert!(!first.is_end());

        let second = aggregator.recv().await.unwrap().unwrap();
        assert!(second.is_end());
    }

    #[tokio::test]
    async fn die_is_observed_by_poll_die_not_recv() {
        let (mut aggregator, mut workers) = in_process_pool(2);
        let mut worker = workers.remove(0);
        assert!(!worker.poll_die());

        aggregator.send_die(Rank(1)).await.unwrap();
        assert!(worker.poll_die());
        assert!(!worker.poll_die());
    }

    #[tokio::test]
    async fn dead_confirmation_is_visible_to_aggregator() {
        let (mut aggregator, mut workers) = in_process_pool(2);
        let mut worker = workers.remove(0);
        worker.send_dead().await.unwrap();
        let envelope = aggregator.recv().await.unwrap().unwrap();
        assert!(matches!(envelope, Envelope::Dead { worker_rank } if worker_rank == Rank(1)));
    }

    #[test]
    fn worker_count_matches_pool_size_minus_aggregator() {
        let (aggregator, workers) = in_process_pool(4);
        assert_eq!(aggregator.worker_count(), 3);
        assert_eq!(workers.len(), 3);
    }
}
