//! The `"xes"` processor family: accumulates a 1-D emission spectrum across
//! events instead of a 2-D radial average, published under `view:omdata`.

use photon_core::record::TIMESTAMP_FIELD;
use photon_core::{PhotonError, Rank, RecordMap, Tag};
use serde_json::Value;

const SPECTRUM_FIELD: &str = "detector_data";

fn spectrum(record: &RecordMap, rank: Rank) -> Result<Vec<f64>, PhotonError> {
    let value = record.get(SPECTRUM_FIELD).ok_or_else(|| {
        PhotonError::fatal_worker(rank.get(), format!("record is missing '{SPECTRUM_FIELD}'"))
    })?;
    let array = value
        .as_array()
        .ok_or_else(|| PhotonError::fatal_worker(rank.get(), "spectrum is not an array"))?;
    array
        .iter()
        .map(|v| {
            v.as_f64()
                .ok_or_else(|| PhotonError::fatal_worker(rank.get(), "spectrum entry is not numeric"))
        })
        .collect()
}

/// Configuration for one [`XesProcessor`] instance.
#[derive(Debug, Clone)]
pub struct XesConfig {
    /// Publish the accumulated spectrum every this many collected events.
    pub publish_every: u64,
}

impl Default for XesConfig {
    fn default() -> Self {
        Self { publish_every: 1 }
    }
}

/// Cumulative spectrum accumulator, published under `view:omdata`.
pub struct XesProcessor {
    config: XesConfig,
    collected_events: u64,
    spectrum_sum: Vec<f64>,
}

impl XesProcessor {
    #[must_use]
    pub fn new(config: XesConfig) -> Self {
        Self {
            config,
            collected_events: 0,
            spectrum_sum: Vec::new(),
        }
    }

    fn accumulate(&mut self, frame: &[f64]) {
        if self.spectrum_sum.len() < frame.len() {
            self.spectrum_sum.resize(frame.len(), 0.0);
        }
        for (acc, value) in self.spectrum_sum.iter_mut().zip(frame.iter()) {
            *acc += value;
        }
        self.collected_events += 1;
    }
}

impl crate::processor::Processor for XesProcessor {
    fn initialize_worker(&mut self, _rank: Rank, _pool_size: u32) -> Result<(), PhotonError> {
        Ok(())
    }

    fn initialize_aggregator(&mut self, _rank: Rank, _pool_size: u32) -> Result<(), PhotonError> {
        self.collected_events = 0;
        self.spectrum_sum.clear();
        Ok(())
    }

    fn process(
        &mut self,
        rank: Rank,
        _pool_size: u32,
        record: RecordMap,
    ) -> Result<RecordMap, PhotonError> {
        let frame = spectrum(&record, rank)?;
        let mut payload = RecordMap::new();
        payload.insert(SPECTRUM_FIELD.to_string(), Value::from(frame));
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
        let frame = payload
            .get(SPECTRUM_FIELD)
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(Value::as_f64).collect::<Vec<_>>())
            .unwrap_or_default();
        self.accumulate(&frame);

        if self.collected_events % self.config.publish_every != 0 {
            return Ok(None);
        }

        let mut out = RecordMap::new();
        out.insert("spectrum".to_string(), Value::from(self.spectrum_sum.clone()));
        out.insert(
            "collected_events".to_string(),
            Value::from(self.collected_events),
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
        out.insert("spectrum".to_string(), Value::from(self.spectrum_sum.clone()));
        out.insert(
            "collected_events".to_string(),
            Value::from(self.collected_events),
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
        record.insert(SPECTRUM_FIELD.to_string(), Value::from(detector_data));
        record.insert(TIMESTAMP_FIELD.to_string(), Value::from(1.0));
        record
    }

    #[test]
    fn accumulates_spectrum_across_events() {
        let mut processor = XesProcessor::new(XesConfig { publish_every: 1 });
        processor.initialize_aggregator(Rank(0), 2).unwrap();

        let payload = processor.process(Rank(1), 2, record_with(vec![1.0, 2.0])).unwrap();
        processor.collect(Rank(0), 2, payload, Rank(1)).unwrap();
        let payload = processor.process(Rank(1), 2, record_with(vec![3.0, 4.0])).unwrap();
        let (tag, out) = processor
            .collect(Rank(0), 2, payload, Rank(1))
            .unwrap()
            .unwrap();

        assert_eq!(tag.as_str(), "view:omdata");
        let spectrum = out.get("spectrum").unwrap().as_array().unwrap();
        assert_eq!(spectrum[0].as_f64().unwrap(), 4.0);
        assert_eq!(spectrum[1].as_f64().unwrap(), 6.0);
    }

    #[test]
    fn missing_spectrum_field_is_a_fatal_worker_error() {
        let mut processor = XesProcessor::new(XesConfig::default());
        let err = processor.process(Rank(1), 2, RecordMap::new()).unwrap_err();
        assert!(matches!(err, PhotonError::FatalWorker { .. }));
    }
}
