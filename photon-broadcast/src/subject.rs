//! `BroadcastChannel`: a hot, best-effort, non-blocking multi-subscriber
//! publisher (spec §4.4), modelled on a publish-to-all / filter-on-subscribe
//! pub/sub socket pattern. Late subscribers never see past messages; slow
//! subscribers are dropped rather than allowed to backpressure the aggregator.

use parking_lot::Mutex;
use photon_core::{RecordMap, Tag};
use std::sync::Arc;
use tokio::sync::mpsc;

/// One published item: a tag and the payload to broadcast under it.
pub type Published = (Tag, RecordMap);

/// Bound on each subscriber's outstanding-message queue. A subscriber that falls
/// this far behind is dropped on the next publish rather than buffered
/// indefinitely, per spec §4.4 and §5.
const SUBSCRIBER_QUEUE_DEPTH: usize = 64;

struct State {
    subscribers: Vec<mpsc::Sender<Published>>,
}

/// Hot, unbounded-subscriber-count, best-effort broadcast channel.
///
/// Cheap to clone: all clones share the same subscriber list.
#[derive(Clone)]
pub struct BroadcastChannel {
    state: Arc<Mutex<State>>,
}

impl BroadcastChannel {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                subscribers: Vec::new(),
            })),
        }
    }

    /// Subscribes to this channel. Messages sent before this call are never
    /// delivered. Pass a `prefix` to have [`Subscription::recv`] filter locally,
    /// mirroring a SUB socket's client-side tag match.
    #[must_use]
    pub fn subscribe(&self, prefix: Option<impl Into<String>>) -> Subscription {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE_DEPTH);
        self.state.lock().subscribers.push(tx);
        Subscription {
            rx,
            prefix: prefix.map(Into::into),
        }
    }

    /// Publishes `(tag, payload)` to every current subscriber. Never blocks: a
    /// subscriber whose queue is full is dropped from the subscriber list instead
    /// of stalling the caller.
    pub fn publish(&self, tag: Tag, payload: RecordMap) {
        let mut state = self.state.lock();
        state.subscribers.retain(|tx| {
            tx.try_send((tag.clone(), payload.clone())).is_ok()
        });
    }

    /// Number of subscribers still accepting messages, as of the last publish or
    /// subscribe call. Dropped subscribers are pruned lazily, only on publish.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }
}

impl Default for BroadcastChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// A receiving handle into a [`BroadcastChannel`], filtering by tag prefix if one
/// was given to [`BroadcastChannel::subscribe`].
pub struct Subscription {
    rx: mpsc::Receiver<Published>,
    prefix: Option<String>,
}

impl Subscription {
    /// Awaits the next message matching this subscription's prefix (or any
    /// message, if no prefix was given). Returns `None` once the channel side of
    /// every publisher has dropped.
    pub async fn recv(&mut self) -> Option<Published> {
        loop {
            let (tag, payload) = self.rx.recv().await?;
            match &self.prefix {
                Some(prefix) if !tag.matches_prefix(prefix) => continue,
                _ => return Some((tag, payload)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_only_see_messages_published_after_they_joined() {
        let channel = BroadcastChannel::new();
        channel.publish(Tag::new("view:omdata"), RecordMap::new());

        let mut sub = channel.subscribe::<String>(None);
        channel.publish(Tag::new("view:omdata"), RecordMap::new());

        let received = sub.recv().await;
        assert!(received.is_some());
    }

    #[tokio::test]
    async fn subscription_filters_by_tag_prefix() {
        let channel = BroadcastChannel::new();
        let mut sub = channel.subscribe(Some("view:omdata"));

        channel.publish(Tag::new("view:omradialaverage"), RecordMap::new());
        channel.publish(Tag::new("view:omdata"), RecordMap::new());

        let (tag, _) = sub.recv().await.unwrap();
        assert_eq!(tag.as_str(), "view:omdata");
    }

    #[tokio::test]
    async fn full_subscriber_queue_is_dropped_not_blocked() {
        let channel = BroadcastChannel::new();
        let _sub = channel.subscribe::<String>(None); // never polled
        for _ in 0..(SUBSCRIBER_QUEUE_DEPTH + 10) {
            channel.publish(Tag::new("view:omdata"), RecordMap::new());
        }
        assert_eq!(channel.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn disconnecting_does_not_affect_publish() {
        let channel = BroadcastChannel::new();
        let sub = channel.subscribe::<String>(None);
        drop(sub);
        channel.publish(Tag::new("view:omdata"), RecordMap::new());
        assert_eq!(channel.subscriber_count(), 0);
    }
}
