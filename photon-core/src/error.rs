//! Error taxonomy for the fabric.
//!
//! [`PhotonError`] is the root type every layer converts into on its way up to the
//! worker/aggregator loop. The variants mirror the kinds enumerated for the control
//! plane: configuration failures are fatal at startup, extraction failures are
//! recovered frame-by-frame, and everything else is either a fatal worker error or
//! a transport error that triggers shutdown.

/// Root error type for fabric operations.
#[derive(Debug, thiserror::Error)]
pub enum PhotonError {
    /// A configuration group or key was missing, or had the wrong type.
    #[error("configuration error: {context}")]
    Config {
        /// Human-readable description of what was missing or malformed.
        context: String,
    },

    /// A required native dependency (detector library, calibration store, …) was
    /// unavailable at startup.
    #[error("missing dependency: {context}")]
    MissingDependency {
        /// Description of the unavailable dependency.
        context: String,
    },

    /// A single frame could not be extracted. Recovered locally by the worker loop:
    /// logged, frame skipped, iteration continues.
    #[error("extraction error on source '{source_name}': {cause}")]
    Extraction {
        /// Name of the extraction function that failed.
        source_name: String,
        /// Underlying cause.
        cause: String,
    },

    /// Any other error surfacing from inside a worker's event loop that isn't an
    /// `Extraction` error. Triggers a worker-initiated shutdown.
    #[error("fatal worker error (rank {rank}): {context}")]
    FatalWorker {
        /// Rank of the worker that failed.
        rank: u32,
        /// Description of the failure.
        context: String,
    },

    /// A send or receive on the worker<->aggregator transport failed.
    #[error("transport error: {context}")]
    Transport {
        /// Description of the I/O or protocol failure.
        context: String,
    },

    /// A `SIGINT` was observed by the aggregator or a worker.
    #[error("interrupted")]
    Interrupt,
}

impl PhotonError {
    /// Builds a [`PhotonError::Config`] from any displayable context.
    pub fn config(context: impl Into<String>) -> Self {
        Self::Config {
            context: context.into(),
        }
    }

    /// Builds a [`PhotonError::MissingDependency`].
    pub fn missing_dependency(context: impl Into<String>) -> Self {
        Self::MissingDependency {
            context: context.into(),
        }
    }

    /// Builds a [`PhotonError::Extraction`].
    pub fn extraction(source_name: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::Extraction {
            source_name: source_name.into(),
            cause: cause.to_string(),
        }
    }

    /// Builds a [`PhotonError::FatalWorker`].
    pub fn fatal_worker(rank: u32, context: impl Into<String>) -> Self {
        Self::FatalWorker {
            rank,
            context: context.into(),
        }
    }

    /// Builds a [`PhotonError::Transport`].
    pub fn transport(context: impl Into<String>) -> Self {
        Self::Transport {
            context: context.into(),
        }
    }

    /// True for the subset of errors that are recovered in place rather than
    /// propagated to shutdown (currently only [`PhotonError::Extraction`]).
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Extraction { .. })
    }

    /// One-line diagnostic of the shape required by the spec: component, rank (if
    /// known), and cause.
    pub fn diagnostic(&self, component: &str, rank: Option<u32>) -> String {
        let rank_part = rank.map_or_else(String::new, |r| format!(" rank={r}"));
        format!("[{component}{rank_part}] {self}")
    }
}

/// Specialized `Result` alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, PhotonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_errors_are_recoverable() {
        let err = PhotonError::extraction("timestamp", "bad header");
        assert!(err.is_recoverable());
    }

    #[test]
    fn transport_errors_are_not_recoverable() {
        let err = PhotonError::transport("connection reset");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn diagnostic_includes_component_and_rank() {
        let err = PhotonError::fatal_worker(3, "panic in extractor");
        let line = err.diagnostic("worker", Some(3));
        assert!(line.contains("worker"));
        assert!(line.contains("rank=3"));
        assert!(line.contains("panic in extractor"));
    }
}
