//! Wire envelope for the worker<->aggregator channel (spec §4.5, §6): three
//! discriminated message kinds carried over whichever [`Transport`](crate::transport)
//! implementation is in use. `END` is not a fourth discriminant — it is a `Data`
//! payload shaped `{"end": true}`, per the spec.

use photon_core::{Rank, RecordMap};
use serde::{Deserialize, Serialize};

/// One frame on the worker<->aggregator channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Envelope {
    /// A reduced payload produced by `Processor::process` or `Processor::end_worker`,
    /// tagged with the rank of the worker that produced it.
    Data {
        worker_rank: Rank,
        payload: RecordMap,
    },
    /// Aggregator -> worker: requests immediate shutdown.
    Die,
    /// Worker -> aggregator: confirms a `Die` was honored.
    Dead { worker_rank: Rank },
}

impl Envelope {
    /// Builds the `END` sentinel: a `Data` envelope carrying `{"end": true}`.
    #[must_use]
    pub fn end(worker_rank: Rank) -> Self {
        let mut payload = RecordMap::new();
        payload.insert("end".to_string(), serde_json::Value::from(true));
        Self::Data {
            worker_rank,
            payload,
        }
    }

    /// True for a `Data` envelope built by [`end`](Self::end).
    #[must_use]
    pub fn is_end(&self) -> bool {
        matches!(
            self,
            Self::Data { payload, .. }
                if payload.get("end").and_then(serde_json::Value::as_bool) == Some(true)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_sentinel_is_a_data_envelope_with_end_flag() {
        let envelope = Envelope::end(Rank(2));
        assert!(envelope.is_end());
        match envelope {
            Envelope::Data { worker_rank, .. } => assert_eq!(worker_rank, Rank(2)),
            _ => panic!("expected Data variant"),
        }
    }

    #[test]
    fn ordinary_data_is_not_end() {
        let envelope = Envelope::Data {
            worker_rank: Rank(1),
            payload: RecordMap::new(),
        };
        assert!(!envelope.is_end());
    }
}
