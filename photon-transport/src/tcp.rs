//! TCP `Transport` implementation for a real multi-process deployment: each
//! worker dials out to the aggregator's listening socket, announces its rank,
//! and the connection then carries `Data`/`End`/`Dead` frames one way and `Die`
//! frames the other, length-prefixed and MessagePack-encoded (spec §6: "the
//! worker->aggregator channel carries length-prefixed, self-describing records").

use crate::message::Envelope;
use crate::transport::{AggregatorTransport, WorkerTransport};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use photon_core::{PhotonError, Rank, RecordMap};
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};

const DIE_CAPACITY: usize = 1;
const UPLINK_CAPACITY: usize = 256;

fn codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::new()
}

fn encode(envelope: &Envelope) -> Result<Bytes, PhotonError> {
    rmp_serde::to_vec(envelope)
        .map(Bytes::from)
        .map_err(|e| PhotonError::transport(format!("encode failure: {e}")))
}

fn decode(bytes: &[u8]) -> Result<Envelope, PhotonError> {
    rmp_serde::from_slice(bytes).map_err(|e| PhotonError::transport(format!("decode failure: {e}")))
}

async fn write_handshake(
    write: &mut FramedWrite<OwnedWriteHalf, LengthDelimitedCodec>,
    rank: Rank,
) -> Result<(), PhotonError> {
    let bytes = rmp_serde::to_vec(&rank.0)
        .map(Bytes::from)
        .map_err(|e| PhotonError::transport(format!("handshake encode failure: {e}")))?;
    write
        .send(bytes)
        .await
        .map_err(|e| PhotonError::transport(format!("handshake send failure: {e}")))
}

async fn read_handshake(
    read: &mut FramedRead<OwnedReadHalf, LengthDelimitedCodec>,
) -> Result<Rank, PhotonError> {
    let frame = read
        .next()
        .await
        .ok_or_else(|| PhotonError::transport("connection closed before handshake"))?
        .map_err(|e| PhotonError::transport(format!("handshake read failure: {e}")))?;
    let rank: u32 = rmp_serde::from_slice(&frame)
        .map_err(|e| PhotonError::transport(format!("handshake decode failure: {e}")))?;
    Ok(Rank(rank))
}

/// Spawns a background task that forwards `Die` frames read off `read` into
/// `die_tx`, and any other frame is a protocol violation and ends the task.
fn spawn_die_listener(
    mut read: FramedRead<OwnedReadHalf, LengthDelimitedCodec>,
    die_tx: mpsc::Sender<()>,
) {
    tokio::spawn(async move {
        while let Some(frame) = read.next().await {
            let Ok(bytes) = frame else { break };
            if matches!(decode(&bytes), Ok(Envelope::Die)) {
                if die_tx.send(()).await.is_err() {
                    break;
                }
            }
        }
    });
}

/// Worker-side TCP transport: dial out to the aggregator and announce `rank`.
pub struct TcpWorkerTransport {
    rank: Rank,
    write: FramedWrite<OwnedWriteHalf, LengthDelimitedCodec>,
    die_rx: mpsc::Receiver<()>,
}

impl TcpWorkerTransport {
    /// Connects to the aggregator at `addr` and performs the rank handshake.
    ///
    /// # Errors
    /// [`PhotonError::Transport`] if the connection or handshake fails.
    pub async fn connect(addr: SocketAddr, rank: Rank) -> Result<Self, PhotonError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| PhotonError::transport(format!("connect to {addr}: {e}")))?;
        let (read_half, write_half) = stream.into_split();
        let mut write = FramedWrite::new(write_half, codec());
        write_handshake(&mut write, rank).await?;

        let read = FramedRead::new(read_half, codec());
        let (die_tx, die_rx) = mpsc::channel(DIE_CAPACITY);
        spawn_die_listener(read, die_tx);

        Ok(Self { rank, write, die_rx })
    }

    async fn send_envelope(&mut self, envelope: Envelope) -> Result<(), PhotonError> {
        let bytes = encode(&envelope)?;
        self.write
            .send(bytes)
            .await
            .map_err(|e| PhotonError::transport(format!("send failure: {e}")))
    }
}

#[async_trait]
impl WorkerTransport for TcpWorkerTransport {
    async fn send_data(&mut self, payload: RecordMap) -> Result<(), PhotonError> {
        self.send_envelope(Envelope::Data {
            worker_rank: self.rank,
            payload,
        })
        .await
    }

    async fn send_end(&mut self) -> Result<(), PhotonError> {
        let envelope = Envelope::end(self.rank);
        self.send_envelope(envelope).await
    }

    fn poll_die(&mut self) -> bool {
        matches!(self.die_rx.try_recv(), Ok(()))
    }

    async fn send_dead(&mut self) -> Result<(), PhotonError> {
        self.send_envelope(Envelope::Dead {
            worker_rank: self.rank,
        })
        .await
    }
}

/// Aggregator-side TCP transport: accepts `worker_count` incoming connections,
/// reading each worker's announced rank off its handshake frame.
pub struct TcpAggregatorTransport {
    uplink_rx: mpsc::Receiver<Envelope>,
    writers: HashMap<Rank, FramedWrite<OwnedWriteHalf, LengthDelimitedCodec>>,
}

impl TcpAggregatorTransport {
    /// Binds `addr` and accepts exactly `worker_count` worker connections.
    ///
    /// # Errors
    /// [`PhotonError::Transport`] if the bind, accept, or any handshake fails.
    pub async fn bind(addr: SocketAddr, worker_count: u32) -> Result<Self, PhotonError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| PhotonError::transport(format!("bind {addr}: {e}")))?;
        Self::accept_from(listener, worker_count).await
    }

    /// Accepts `worker_count` connections off an already-bound `listener`.
    ///
    /// # Errors
    /// [`PhotonError::Transport`] if accept or any handshake fails.
    pub async fn accept_from(
        listener: TcpListener,
        worker_count: u32,
    ) -> Result<Self, PhotonError> {
        let (uplink_tx, uplink_rx) = mpsc::channel(UPLINK_CAPACITY);
        let mut writers = HashMap::new();

        for _ in 0..worker_count {
            let (stream, _peer) = listener
                .accept()
                .await
                .map_err(|e| PhotonError::transport(format!("accept: {e}")))?;
            let (read_half, write_half) = stream.into_split();
            let mut read = FramedRead::new(read_half, codec());
            let rank = read_handshake(&mut read).await?;
            let write = FramedWrite::new(write_half, codec());
            writers.insert(rank, write);

            let uplink_tx = uplink_tx.clone();
            tokio::spawn(async move {
                let mut read = read;
                while let Some(frame) = read.next().await {
                    let Ok(bytes) = frame else { break };
                    let Ok(envelope) = decode(&bytes) else { break };
                    if uplink_tx.send(envelope).await.is_err() {
                        break;
                    }
                }
            });
        }

        Ok(Self { uplink_rx, writers })
    }
}

#[async_trait]
impl AggregatorTransport for TcpAggregatorTransport {
    async fn recv(&mut self) -> Result<Option<Envelope>, PhotonError> {
        Ok(self.uplink_rx.recv().await)
    }

    async fn send_die(&mut self, worker_rank: Rank) -> Result<(), PhotonError> {
        let writer = self.writers.get_mut(&worker_rank).ok_or_else(|| {
            PhotonError::transport(format!("no connection for worker rank {worker_rank}"))
        })?;
        let bytes = encode(&Envelope::Die)?;
        writer
            .send(bytes)
            .await
            .map_err(|e| PhotonError::transport(format!("send_die failure: {e}")))
    }

    fn worker_count(&self) -> u32 {
        self.writers.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn handshake_then_data_then_die_roundtrip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let accept = tokio::spawn(TcpAggregatorTransport::accept_from(listener, 1));
        let mut worker = TcpWorkerTransport::connect(addr, Rank(1)).await.unwrap();
        let mut aggregator = accept.await.unwrap().unwrap();

        worker.send_data(RecordMap::new()).await.unwrap();
        let envelope = aggregator.recv().await.unwrap().unwrap();
        assert!(matches!(envelope, Envelope::Data { worker_rank, .. } if worker_rank == Rank(1)));

        aggregator.send_die(Rank(1)).await.unwrap();
        // give the worker's background die-listener a moment to observe the frame
        for _ in 0..50 {
            if worker.poll_die() {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("worker never observed DIE");
    }
}
