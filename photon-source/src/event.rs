//! The `Event` handle: an opaque facility-level record that may span several frames.

use photon_core::RecordMap;

/// A stable identifier for an event, distinct across the whole run. Used by tests
/// to verify partition completeness (spec §8 property 1) and by processors that
/// want to correlate payloads back to their source event.
pub type EventId = String;

/// One facility-level record.
///
/// Produced by an [`EventSource`](crate::EventSource), [`open`](crate::EventSource::open)ed
/// before extraction, [`close`](crate::EventSource::close)d after the last frame has been
/// processed. Never shared between workers: a worker owns every `Event` it produces
/// for the duration of its open/close bracket.
#[derive(Debug, Clone)]
pub struct Event {
    id: EventId,
    frame_count: usize,
    timestamp: Option<f64>,
    current_frame: usize,
    scratch: RecordMap,
    opened: bool,
}

impl Event {
    /// Constructs an event with `frame_count` frames and no timestamp yet; the
    /// timestamp and any other cached values are filled in by
    /// [`EventSource::open`](crate::EventSource::open).
    #[must_use]
    pub fn new(id: impl Into<EventId>, frame_count: usize) -> Self {
        Self {
            id: id.into(),
            frame_count,
            timestamp: None,
            current_frame: 0,
            scratch: RecordMap::new(),
            opened: false,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub const fn frame_count(&self) -> usize {
        self.frame_count
    }

    #[must_use]
    pub const fn timestamp(&self) -> Option<f64> {
        self.timestamp
    }

    pub fn set_timestamp(&mut self, timestamp: f64) {
        self.timestamp = Some(timestamp);
    }

    #[must_use]
    pub const fn current_frame(&self) -> usize {
        self.current_frame
    }

    /// Advances the iteration cursor. Only the worker's event loop calls this;
    /// extraction functions must treat it as read-only.
    pub fn set_current_frame(&mut self, frame: usize) {
        self.current_frame = frame;
    }

    #[must_use]
    pub const fn scratch(&self) -> &RecordMap {
        &self.scratch
    }

    pub fn scratch_mut(&mut self) -> &mut RecordMap {
        &mut self.scratch
    }

    #[must_use]
    pub const fn is_opened(&self) -> bool {
        self.opened
    }

    pub fn mark_opened(&mut self) {
        self.opened = true;
    }

    pub fn mark_closed(&mut self) {
        self.opened = false;
    }
}
