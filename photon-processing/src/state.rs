//! `AggregatorState`: state private to the aggregator half of a `Processor`.
//! Mutated only by the collect path; never shared with workers (spec §3).

use std::collections::VecDeque;

/// Running counters and bounded-history deques shared by the crystallography,
/// xes and cheetah processor families. Each family wraps one of these plus
/// whatever extra accumulator (radial average, spectrum sum, …) it needs.
#[derive(Debug, Clone)]
pub struct AggregatorState {
    /// Total payloads folded in via `collect`, across all workers.
    pub collected_events: u64,
    /// Subset of `collected_events` the processor judged a "hit".
    pub hit_count: u64,
    /// Fixed-maxlen ring buffer of recent per-event hit flags, used to compute a
    /// windowed hit rate instead of the lifetime average.
    hit_history: VecDeque<bool>,
    history_maxlen: usize,
}

impl AggregatorState {
    #[must_use]
    pub fn new(history_maxlen: usize) -> Self {
        Self {
            collected_events: 0,
            hit_count: 0,
            hit_history: VecDeque::with_capacity(history_maxlen.max(1)),
            history_maxlen: history_maxlen.max(1),
        }
    }

    /// Folds one event's hit verdict into the running counters and the bounded
    /// history, evicting the oldest entry once `history_maxlen` is reached.
    pub fn record(&mut self, is_hit: bool) {
        self.collected_events += 1;
        if is_hit {
            self.hit_count += 1;
        }
        if self.hit_history.len() == self.history_maxlen {
            self.hit_history.pop_front();
        }
        self.hit_history.push_back(is_hit);
    }

    /// Lifetime hit rate across every event ever collected.
    #[must_use]
    pub fn lifetime_hit_rate(&self) -> f64 {
        if self.collected_events == 0 {
            0.0
        } else {
            self.hit_count as f64 / self.collected_events as f64
        }
    }

    /// Hit rate over just the bounded recent-history window.
    #[must_use]
    pub fn windowed_hit_rate(&self) -> f64 {
        if self.hit_history.is_empty() {
            0.0
        } else {
            let hits = self.hit_history.iter().filter(|h| **h).count();
            hits as f64 / self.hit_history.len() as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_buffer_evicts_oldest_entry() {
        let mut state = AggregatorState::new(3);
        for hit in [true, true, true, false] {
            state.record(hit);
        }
        assert_eq!(state.collected_events, 4);
        assert_eq!(state.hit_count, 3);
        // window only holds the last 3: [true, true, false]
        assert!((state.windowed_hit_rate() - (2.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn empty_state_reports_zero_rates() {
        let state = AggregatorState::new(10);
        assert_eq!(state.lifetime_hit_rate(), 0.0);
        assert_eq!(state.windowed_hit_rate(), 0.0);
    }
}
