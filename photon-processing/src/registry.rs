//! Maps a `processing_layer.processor_identifier` string to a constructed
//! [`Processor`](crate::Processor), the way [`photon_source::SourceRegistry`]
//! maps `data_retrieval_layer.source_identifier` to an [`EventSource`].

use crate::cheetah::{CheetahConfig, CheetahProcessor};
use crate::crystallography::{CrystallographyConfig, CrystallographyProcessor};
use crate::xes::{XesConfig, XesProcessor};
use crate::Processor;
use photon_config::ConfigTree;
use photon_core::PhotonError;

const GROUP: &str = "processing_layer";

/// Constructs the named [`Processor`] implementation, reading its tunables out
/// of the `processing_layer` configuration group.
///
/// # Errors
/// Returns [`PhotonError::Config`] if `identifier` is unrecognized or a
/// required tunable is missing or malformed.
pub struct ProcessorRegistry;

impl ProcessorRegistry {
    /// Builds the processor named by `identifier`.
    pub fn build(identifier: &str, config: &ConfigTree) -> Result<Box<dyn Processor>, PhotonError> {
        match identifier {
            "crystallography" => {
                let hit_threshold = config.get(GROUP, "hit_threshold", false)?.unwrap_or(100.0);
                let min_peaks_for_hit: u64 =
                    config.get(GROUP, "min_peaks_for_hit", false)?.unwrap_or(10);
                let history_maxlen: u64 =
                    config.get(GROUP, "history_maxlen", false)?.unwrap_or(1000);
                let publish_every: u64 = config.get(GROUP, "publish_every", false)?.unwrap_or(1);
                Ok(Box::new(CrystallographyProcessor::new(CrystallographyConfig {
                    hit_threshold,
                    min_peaks_for_hit: min_peaks_for_hit as usize,
                    history_maxlen: history_maxlen as usize,
                    publish_every,
                })))
            }
            "xes" => {
                let publish_every: u64 = config.get(GROUP, "publish_every", false)?.unwrap_or(1);
                Ok(Box::new(XesProcessor::new(XesConfig { publish_every })))
            }
            "cheetah" => {
                let hit_threshold = config.get(GROUP, "hit_threshold", false)?.unwrap_or(100.0);
                let min_peaks_for_hit: u64 =
                    config.get(GROUP, "min_peaks_for_hit", false)?.unwrap_or(10);
                let history_maxlen: u64 =
                    config.get(GROUP, "history_maxlen", false)?.unwrap_or(1000);
                Ok(Box::new(CheetahProcessor::new(CheetahConfig {
                    hit_threshold,
                    min_peaks_for_hit: min_peaks_for_hit as usize,
                    history_maxlen: history_maxlen as usize,
                })))
            }
            other => Err(PhotonError::config(format!(
                "unrecognized processor identifier '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_each_known_identifier() {
        let config = ConfigTree::from_str("processing_layer:\n  hit_threshold: 5\n").unwrap();
        for id in ["crystallography", "xes", "cheetah"] {
            assert!(ProcessorRegistry::build(id, &config).is_ok());
        }
    }

    #[test]
    fn unknown_identifier_is_a_config_error() {
        let config = ConfigTree::from_str("processing_layer:\n  hit_threshold: 5\n").unwrap();
        let err = ProcessorRegistry::build("not-a-real-processor", &config).unwrap_err();
        assert!(matches!(err, PhotonError::Config { .. }));
    }
}
