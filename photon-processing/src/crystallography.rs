//! The `"crystallography"` processor family: per-frame hit finding against a
//! configured peak threshold, a running hit rate, and a cumulative radial
//! average published to its companion viewer.

use crate::state::AggregatorState;
use photon_core::record::TIMESTAMP_FIELD;
use photon_core::{PhotonError, Rank, RecordMap, Tag};
use serde_json::Value;

const DETECTOR_DATA_FIELD: &str = "detector_data";

fn detector_data(record: &RecordMap, rank: Rank) -> Result<Vec<f64>, PhotonError> {
    let value = record.get(DETECTOR_DATA_FIELD).ok_or_else(|| {
        PhotonError::fatal_worker(
            rank.get(),
            format!("extracted record is missing '{DETECTOR_DATA_FIELD}'"),
        )
    })?;
    let array = value.as_array().ok_or_else(|| {
        PhotonError::fatal_worker(
            rank.get(),
            format!("'{DETECTOR_DATA_FIELD}' is not an array"),
        )
    })?;
    array
        .iter()
        .map(|v| {
            v.as_f64().ok_or_else(|| {
                PhotonError::fatal_worker(rank.get(), "detector_data entry is not numeric")
            })
        })
        .collect()
}

/// Configuration for one [`CrystallographyProcessor`] instance, read from the
/// `processing_layer` configuration group.
#[derive(Debug, Clone)]
pub struct CrystallographyConfig {
    /// Pixel intensity above which a value counts toward a peak.
    pub hit_threshold: f64,
    /// Minimum peak count for a frame to be judged a hit.
    pub min_peaks_for_hit: usize,
    /// Length of the bounded recent-hit-rate window.
    pub history_maxlen: usize,
    /// Publish `view:omdata` every this many collected events.
    pub publish_every: u64,
}

impl Default for CrystallographyConfig {
    fn default() -> Self {
        Self {
            hit_threshold: 100.0,
            min_peaks_for_hit: 10,
            history_maxlen: 1000,
            publish_every: 1,
        }
    }
}

/// Hit-finding + radial-averaging processor, published under `view:omdata` (hit
/// rate) and `view:omradialaverage` (cumulative radial average).
pub struct CrystallographyProcessor {
    config: CrystallographyConfig,
    state: AggregatorState,
    radial_sum: Vec<f64>,
    radial_count: u64,
}

impl CrystallographyProcessor {
    #[must_use]
    pub fn new(config: CrystallographyConfig) -> Self {
        let history_maxlen = config.history_maxlen;
        Self {
            config,
            state: AggregatorState::new(history_maxlen),
            radial_sum: Vec::new(),
            radial_count: 0,
        }
    }

    fn accumulate_radial(&mut self, frame: &[f64]) {
        if self.radial_sum.len() < frame.len() {
            self.radial_sum.resize(frame.len(), 0.0);
        }
        for (acc, value) in self.radial_sum.iter_mut().zip(frame.iter()) {
            *acc += value;
        }
        self.radial_count += 1;
    }

    fn radial_average(&self) -> Vec<f64> {
        if self.radial_count == 0 {
            return Vec::new();
        }
        self.radial_sum
            .iter()
            .map(|sum| sum / self.radial_count as f64)
            .collect()
    }
}

impl crate::processor::Processor for CrystallographyProcessor {
    fn initialize_worker(&mut self, _rank: Rank, _pool_size: u32) -> Result<(), PhotonError> {
        Ok(())
    }

    fn initialize_aggregator(&mut self, _rank: Rank, _pool_size: u32) -> Result<(), PhotonError> {
        self.state = AggregatorState::new(self.config.history_maxlen);
        self.radial_sum.clear();
        self.radial_count = 0;
        Ok(())
    }

    fn process(
        &mut self,
        rank: Rank,
        _pool_size: u32,
        record: RecordMap,
    ) -> Result<RecordMap, PhotonError> {
        let frame = detector_data(&record, rank)?;
        let num_peaks = frame.iter().filter(|v| **v > self.config.hit_threshold).count();
        let is_hit = num_peaks >= self.config.min_peaks_for_hit;

        let mut payload = RecordMap::new();
        payload.insert("num_peaks".to_string(), Value::from(num_peaks as u64));
        payload.insert("hit".to_string(), Value::from(is_hit));
        payload.insert(
            DETECTOR_DATA_FIELD.to_string(),
            record
                .get(DETECTOR_DATA_FIELD)
                .cloned()
                .unwrap_or(Value::Null),
        );
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
        let is_hit = payload.get("hit").and_then(Value::as_bool).unwrap_or(false);
        let frame = payload
            .get(DETECTOR_DATA_FIELD)
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(Value::as_f64).collect::<Vec<_>>())
            .unwrap_or_default();

        self.state.record(is_hit);
        self.accumulate_radial(&frame);

        if self.state.collected_events % self.config.publish_every != 0 {
            return Ok(None);
        }

        let mut out = RecordMap::new();
        out.insert(
            "collected_events".to_string(),
            Value::from(self.state.collected_events),
        );
        out.insert(
            "hit_count".to_string(),
            Value::from(self.state.hit_count),
        );
        out.insert(
            "hit_rate".to_string(),
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
            "radial_average".to_string(),
            Value::from(self.radial_average()),
        );
        out.insert(
            "collected_events".to_string(),
            Value::from(self.state.collected_events),
        );
        Ok(Some((Tag::new("view:omradialaverage"), out)))
    }
}
