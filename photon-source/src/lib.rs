#![allow(clippy::multiple_crate_versions)]
//! The `EventSource` and `DataExtractor` contracts (spec §4.1, §4.2), plus two
//! concrete `EventSource` identifiers: an offline, file-list-backed source with
//! deterministic partitioning, and an online, channel-fed source exempt from it.

pub mod event;
pub mod extractor;
pub mod files;
pub mod live;
pub mod registry;
pub mod source;

pub use event::Event;
pub use extractor::{DataExtractor, ExtractFn, ExtractionError};
pub use registry::SourceRegistry;
pub use source::{EventSource, EventStream};
