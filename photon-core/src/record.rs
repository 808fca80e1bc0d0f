//! Self-describing record types shared by `ExtractedRecord`, `ReducedPayload` and
//! `SubscriberMessage`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The required field every `ExtractedRecord` carries.
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// A self-describing mapping from field name to arbitrary value.
///
/// `ExtractedRecord`, `ReducedPayload` and the payload half of a `SubscriberMessage`
/// all use this representation: a native map/value tree that both sides of a wire
/// boundary can deserialize into without a shared schema. The wire encoding
/// ([`photon_transport`](../photon_transport/index.html) and
/// [`photon_broadcast`](../photon_broadcast/index.html)) is MessagePack; this type is
/// the in-memory shape both ends settle on after decoding.
pub type RecordMap = Map<String, Value>;

/// Rank of an actor within a run: `0` is the aggregator, `1..pool_size` are workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Rank(pub u32);

impl Rank {
    /// The aggregator's rank is always zero.
    pub const AGGREGATOR: Rank = Rank(0);

    #[must_use]
    pub const fn is_aggregator(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque UTF-8 label a `SubscriberMessage` is published under. Subscribers match
/// by prefix, not exact equality.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tag(pub String);

impl Tag {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn matches_prefix(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Tag {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregator_rank_is_zero() {
        assert!(Rank::AGGREGATOR.is_aggregator());
        assert!(!Rank(1).is_aggregator());
    }

    #[test]
    fn tag_prefix_matching() {
        let tag = Tag::new("view:omradialaverage");
        assert!(tag.matches_prefix("view:"));
        assert!(tag.matches_prefix("view:omradial"));
        assert!(!tag.matches_prefix("view:omdata"));
    }
}
