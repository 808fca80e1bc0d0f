//! Typed structs for the top-level configuration groups named in the external
//! interface section: `data_retrieval_layer` and `parallelization_layer`.
//!
//! `processing_layer` is deliberately left as a raw group: its keys are entirely
//! processor-specific, so each [`photon_processing`](../photon_processing/index.html)
//! implementation reads what it needs directly from the [`crate::ConfigTree`]
//! instead of sharing a one-size-fits-all struct.

use serde::{Deserialize, Deserializer, Serialize};

/// The `data_retrieval_layer` configuration group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataRetrievalConfig {
    /// Selects an `EventSource` implementation by its registry identifier
    /// (`"pilatus-files"`, `"jungfrau1m-files"`, `"eiger16m-files"`, `"psana"`, …).
    pub source_identifier: String,

    /// Caps the number of frames processed per event; `None` means all frames.
    #[serde(default)]
    pub num_frames_in_event_to_process: Option<usize>,

    /// Psana calibration directory, relevant only to the online source.
    #[serde(default)]
    pub psana_calibration_directory: Option<String>,

    /// Fallback beam energy in eV for sources that cannot read it from the data.
    #[serde(default, rename = "fallback_beam_energy_in_eV")]
    pub fallback_beam_energy_in_ev: Option<f64>,

    /// Fallback detector distance in mm for sources that cannot read it from the
    /// data.
    #[serde(default)]
    pub fallback_detector_distance_in_mm: Option<f64>,

    /// Names of the extraction functions the `DataExtractor` must run.
    #[serde(default)]
    pub required_data: Vec<String>,

    /// LCLS-specific extra channels to extract, each a `[kind, identifier, name]`
    /// triple in the YAML source.
    #[serde(default)]
    pub lcls_extra: Vec<LclsExtra>,
}

/// The `parallelization_layer` configuration group.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParallelizationConfig {
    /// Optional hint for the total pool size (aggregator + workers); the
    /// authoritative value is always what the launcher was invoked with.
    #[serde(default)]
    pub pool_size_hint: Option<u32>,
}

/// The kind of an LCLS extra channel, as named in the `lcls_extra` list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LclsExtraKind {
    AcqirisWaveform,
    EpicsPv,
    Wave8TotalIntensity,
}

impl std::str::FromStr for LclsExtraKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "acqiris_waveform" => Ok(Self::AcqirisWaveform),
            "epics_pv" => Ok(Self::EpicsPv),
            "wave8_total_intensity" => Ok(Self::Wave8TotalIntensity),
            other => Err(format!("unrecognized lcls_extra kind '{other}'")),
        }
    }
}

impl<'de> Deserialize<'de> for LclsExtraKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One entry of `data_retrieval_layer.lcls_extra`: a `[kind, identifier, name]`
/// triple naming an additional LCLS channel to extract alongside the detector data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LclsExtra {
    pub kind: LclsExtraKind,
    pub identifier: String,
    pub name: String,
}

impl<'de> Deserialize<'de> for LclsExtra {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (kind, identifier, name) =
            <(LclsExtraKind, String, String)>::deserialize(deserializer)?;
        Ok(Self {
            kind,
            identifier,
            name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConfigTree;

    const DOC: &str = r#"
data_retrieval_layer:
  source_identifier: psana
  num_frames_in_event_to_process: null
  required_data:
    - timestamp
    - detector_data
  lcls_extra:
    - [acqiris_waveform, DetInfo(...):Acqiris, acqiris0]
    - [epics_pv, MFX:MON:PIM:01, pim1]
parallelization_layer:
  pool_size_hint: 8
"#;

    #[test]
    fn data_retrieval_group_parses() {
        let tree = ConfigTree::from_str(DOC).unwrap();
        let cfg: DataRetrievalConfig = tree.get_group("data_retrieval_layer").unwrap();
        assert_eq!(cfg.source_identifier, "psana");
        assert!(cfg.num_frames_in_event_to_process.is_none());
        assert_eq!(cfg.required_data, vec!["timestamp", "detector_data"]);
        assert_eq!(cfg.lcls_extra.len(), 2);
        assert_eq!(cfg.lcls_extra[0].kind, LclsExtraKind::AcqirisWaveform);
        assert_eq!(cfg.lcls_extra[1].name, "pim1");
    }

    #[test]
    fn parallelization_group_parses() {
        let tree = ConfigTree::from_str(DOC).unwrap();
        let cfg: ParallelizationConfig = tree.get_group("parallelization_layer").unwrap();
        assert_eq!(cfg.pool_size_hint, Some(8));
    }
}
