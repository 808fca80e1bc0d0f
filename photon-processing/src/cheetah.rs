//! The `"cheetah"` processor family: a lightweight hit/write-rate tracker with
//! no radial or spectral accumulation, modelled on the original monitor's
//! disk-writing feeder (hits are what get written to disk downstream).

use crate::state::AggregatorState;
use photon_core::record::TIMESTAMP_FIELD;
use photon_core::{PhotonError, Rank, RecordMap, Tag};
use serde_json::Value;

const HIT_FIELD: &str = "hit";

/// Configuration for one [`CheetahProcessor`] instance.
#[derive(Debug, Clone)]
pub struct CheetahConfig {
    /// Pixel intensity above which a value counts toward a peak.
    pub hit_threshold: f64,
    /// Minimum peak count for a frame to be judged a hit.
    pub min_peaks_for_hit: usize,
    /// Length of the bounded recent-hit-rate window.
    pub history_maxlen: usize,
}

impl Default for CheetahConfig {
    fn default() -> Self {
        Self {
            hit_threshold: 100.0,
            min_peaks_for_hit: 10,
            history_maxlen: 1000,
        }
    }
}

/// Write-rate tracker: every frame is judged a hit or not against a threshold,
/// and the aggregator reports lifetime and windowed hit rates only — no
/// per-frame data is retained or republished.
pub struct CheetahProcessor {
    config: CheetahConfig,
    state: AggregatorState,
}

impl CheetahProcessor {
    #[must_use]
    pub fn new(config: CheetahConfig) -> Self {
        let history_maxlen = config.history_maxlen;
        Self {
            config,
            state: AggregatorState::new(history_maxlen),
        }
    }
}

impl crate::processor::Processor for CheetahProcessor {
    fn initialize_worker(&mut self, _rank: Rank, _pool_size: u32) -> Result<(), PhotonError> {
        Ok(())
    }

    fn initialize_aggregator(&mut self, _rank: Rank, _pool_size: u32) -> Result<(), PhotonError> {
        self.state = AggregatorState::new(self.config.history_maxlen);
        Ok(())
    }

    fn process(
        &mut self,
        rank: Rank,
        _pool_size: u32,
        record: RecordMap,
    ) -> Result<RecordMap, PhotonError> {
        let frame = record
            .get("detector_data")
            .and_then(Value::as_array)
            .ok_or_else(|| PhotonError::fatal_worker(rank.get(), "record is missing 'detector_data'"))?;
        let num_peaks = frame
            .iter()
            .filter(|v| v.as_f64().is_some_and(|n| n > self.config.hit_threshold))
            .count();
        let is_hit = num_peaks >= self.config.min_peaks_for_hit;

        let mut payload = RecordMap::new();
        payload.insert(HIT_FIELD.to_string(), Value::from(is_hit));
        payload.insert(
            TIMESTAMP_FIELD.to_string(),
            record.get(TIMESTAMP_FIELD).cloned().unwrap_or(Value::Null),
        );
        Ok(payload)
    }

    fn collect(
        &mut self,
        _rank: Rank,
        _pool_size: u32,
        payload: RecordMap,
        _source_rank: Rank,
    ) -> Result<Option<(Tag, RecordMap)>, PhotonError> {
        let is_hit = payload.get(HIT_FIELD).and_then(Value::as_bool).unwrap_or(false);
        self.state.record(is_hit);

        let mut out = RecordMap::new();
        out.insert(
            "collected_events".to_string(),
            Value::from(self.state.collected_events),
        );
        out.insert(
            "lifetime_hit_rate".to_string(),
            Value::from(self.state.lifetime_hit_rate()),
        );
        out.insert(
            "windowed_hit_rate".to_string(),
            Value::from(self.state.windowed_hit_rate()),
        );
        Ok(Some((Tag::new("view:omdata"), out)))
    }

    fn end_worker(&mut self, _rank: Rank, _pool_size: u32) -> Result<Option<RecordMap>, PhotonError> {
        Ok(None)
    }

    fn end_aggregator(
        &mut self,
        _rank: Rank,
        _pool_size: u32,
    ) -> Result<Option<(Tag, RecordMap)>, PhotonError> {
        let mut out = RecordMap::new();
        out.insert(
            "collected_events".to_string(),
            Value::from(self.state.collected_events),
        );
        out.insert(
            "lifetime_hit_rate".to_string(),
            Value::from(self.state.lifetime_hit_rate()),
        );
        Ok(Some((Tag::new("view:omdata"), out)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::Processor;

    fn record_with(detector_data: Vec<f64>) -> RecordMap {
        let mut record = RecordMap::new();
        record.insert("detector_data".to_string(), Value::from(detector_data));
        record.insert(TIMESTAMP_FIELD.to_string(), Value::from(1.0));
        record
    }

    #[test]
    fn tracks_lifetime_and_windowed_hit_rate() {
        let mut processor = CheetahProcessor::new(CheetahConfig {
            hit_threshold: 5.0,
            min_peaks_for_hit: 1,
            history_maxlen: 2,
        });
        processor.initialize_aggregator(Rank(0), 2).unwrap();

        for data in [vec![10.0], vec![1.0], vec![10.0]] {
            let payload = processor.process(Rank(1), 2, record_with(data)).unwrap();
            processor.collect(Rank(0), 2, payload, Rank(1)).unwrap();
        }

        assert_eq!(processor.state.collected_events, 3);
        assert_eq!(processor.state.hit_count, 2);
        assert!((processor.state.windowed_hit_rate() - 0.5).abs() < 1e-9);
    }
}
