//! An online, channel-fed `EventSource`.
//!
//! Covers the `"psana"` identifier and any other live facility feed: the facility
//! pushes events to the local node continuously, so the source is exempt from the
//! deterministic partitioning offline sources must provide (spec §4.1). Useful for
//! long-running scenarios like S4 (SIGINT mid-stream).

use crate::event::Event;
use crate::source::{EventSource, EventStream};
use async_stream::stream;
use photon_core::{PhotonError, Rank};
use tokio::sync::mpsc::Receiver;
use tokio_stream::wrappers::ReceiverStream;

/// Online `EventSource` backed by an in-process channel, standing in for a live
/// shared-memory or network feed from the facility.
pub struct LiveSource {
    receiver: tokio::sync::Mutex<Option<Receiver<Event>>>,
}

impl LiveSource {
    /// Wraps a channel of already-constructed events. Each `Event` is assumed to
    /// report its own `frame_count`; `open`/`close` are no-ops since the live feed
    /// owns no per-event resource beyond the channel itself.
    #[must_use]
    pub fn new(receiver: Receiver<Event>) -> Self {
        Self {
            receiver: tokio::sync::Mutex::new(Some(receiver)),
        }
    }
}

#[async_trait::async_trait]
impl EventSource for LiveSource {
    async fn initialize(&mut self, _rank: Rank, _pool_size: u32) -> Result<(), PhotonError> {
        Ok(())
    }

    fn events(&self, _rank: Rank, _pool_size: u32) -> EventStream {
        let receiver = self
            .receiver
            .try_lock()
            .ok()
            .and_then(|mut guard| guard.take());

        match receiver {
            Some(receiver) => {
                let mut inner = ReceiverStream::new(receiver);
                Box::pin(stream! {
                    use futures::StreamExt;
                    while let Some(event) = inner.next().await {
                        yield Ok(event);
                    }
                })
            }
            None => Box::pin(futures::stream::empty()),
        }
    }

    async fn open(&self, _event: &mut Event) -> Result<(), PhotonError> {
        Ok(())
    }

    async fn close(&self, _event: &mut Event) -> Result<(), PhotonError> {
        Ok(())
    }

    fn num_frames(&self, event: &Event) -> usize {
        event.frame_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn forwards_whatever_is_pushed_without_partitioning() {
        let (tx, rx) = tokio::sync::mpsc::channel(4);
        let source = LiveSource::new(rx);
        tx.send(Event::new("live-0", 1)).await.unwrap();
        tx.send(Event::new("live-1", 1)).await.unwrap();
        drop(tx);

        let mut stream = source.events(Rank(1), 2);
        let mut ids = Vec::new();
        while let Some(event) = stream.next().await {
            ids.push(event.unwrap().id().to_string());
        }
        assert_eq!(ids, vec!["live-0", "live-1"]);
    }
}
