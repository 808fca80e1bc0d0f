//! The `DataExtractor` contract (spec §4.2): a configured, ordered set of named
//! extraction functions applied to an opened event.

use crate::event::Event;
use photon_core::record::TIMESTAMP_FIELD;
use photon_core::{PhotonError, RecordMap};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Per-frame extraction failure: carries the failing source name and the original
/// cause, as required by the spec. Recovered locally by the worker loop — the
/// frame is skipped and extraction continues with the next one.
#[derive(Debug, Clone, thiserror::Error)]
#[error("extraction failed for source '{source_name}': {cause}")]
pub struct ExtractionError {
    pub source_name: String,
    pub cause: String,
}

impl ExtractionError {
    pub fn new(source_name: impl Into<String>, cause: impl fmt::Display) -> Self {
        Self {
            source_name: source_name.into(),
            cause: cause.to_string(),
        }
    }
}

impl From<ExtractionError> for PhotonError {
    fn from(value: ExtractionError) -> Self {
        PhotonError::extraction(value.source_name, value.cause)
    }
}

/// A single named extraction function: pure with respect to the event (may read
/// `scratch`, must not mutate `current_frame` or close the event).
pub type ExtractFn = Arc<dyn Fn(&Event) -> Result<Value, ExtractionError> + Send + Sync>;

/// Applies a configured, ordered set of extraction functions to an opened event
/// and assembles an `ExtractedRecord`. Extraction is sequential per frame: no
/// intra-frame concurrency, since extraction functions may share event state.
#[derive(Clone)]
pub struct DataExtractor {
    functions: Vec<(String, ExtractFn)>,
}

impl DataExtractor {
    /// Builds an extractor from an ordered list of `(name, function)` pairs. A
    /// `"timestamp"` entry is appended automatically if not already present, since
    /// every `ExtractedRecord` must carry one.
    #[must_use]
    pub fn new(mut functions: Vec<(String, ExtractFn)>) -> Self {
        if !functions.iter().any(|(name, _)| name == TIMESTAMP_FIELD) {
            functions.push((
                TIMESTAMP_FIELD.to_string(),
                Arc::new(|event: &Event| {
                    Ok(event
                        .timestamp()
                        .map_or(Value::Null, |ts| Value::from(ts)))
                }),
            ));
        }
        Self { functions }
    }

    /// Runs every configured extraction function against `event` at its current
    /// frame, in configured order. Stops at the first failure and discards any
    /// partial record, per the spec.
    ///
    /// # Errors
    /// [`ExtractionError`] naming the function that failed and its cause.
    pub fn extract(&self, event: &Event) -> Result<RecordMap, ExtractionError> {
        let mut record = RecordMap::new();
        for (name, function) in &self.functions {
            let value = function(event)?;
            record.insert(name.clone(), value);
        }
        Ok(record)
    }
}
