//! The generic group -> key -> value configuration tree, loaded once from a YAML
//! file at startup and shared read-only for the rest of the run.

use crate::error::ConfigError;
use serde::de::DeserializeOwned;
use serde_yaml::Value;
use std::path::Path;

/// A parsed YAML configuration document, addressed by `(group, key)` pairs.
#[derive(Debug, Clone)]
pub struct ConfigTree {
    groups: Value,
}

impl ConfigTree {
    /// Loads and parses a YAML configuration file from `path`.
    ///
    /// # Errors
    /// Returns [`ConfigError::Unreadable`] if the file cannot be opened, or
    /// [`ConfigError::Syntax`] if it is not valid YAML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|cause| ConfigError::Unreadable {
            path: path.display().to_string(),
            cause: cause.to_string(),
        })?;
        Self::from_str(&contents)
    }

    /// Parses a YAML document already in memory.
    ///
    /// # Errors
    /// Returns [`ConfigError::Syntax`] if `contents` is not valid YAML.
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let groups: Value =
            serde_yaml::from_str(contents).map_err(|cause| ConfigError::Syntax {
                cause: cause.to_string(),
            })?;
        Ok(Self { groups })
    }

    /// Retrieves and deserializes `group.key`.
    ///
    /// Behaves per the spec's `get(group, key, type, required)` contract:
    /// - `required = true` and the key is absent: [`ConfigError::MissingParameter`].
    /// - `required = false` and the key is absent: `Ok(None)`.
    /// - the group itself is absent: [`ConfigError::MissingGroup`] regardless of
    ///   `required` (a monitor cannot silently run with a whole layer missing).
    /// - the key is present but does not deserialize to `T`: [`ConfigError::WrongType`].
    ///
    /// # Errors
    /// See variants above.
    pub fn get<T: DeserializeOwned>(
        &self,
        group: &str,
        key: &str,
        required: bool,
    ) -> Result<Option<T>, ConfigError> {
        let group_value =
            self.groups
                .get(group)
                .ok_or_else(|| ConfigError::MissingGroup {
                    group: group.to_string(),
                })?;

        let Some(raw) = group_value.get(key) else {
            return if required {
                Err(ConfigError::MissingParameter {
                    group: group.to_string(),
                    parameter: key.to_string(),
                })
            } else {
                Ok(None)
            };
        };

        if raw.is_null() {
            return if required {
                Err(ConfigError::MissingParameter {
                    group: group.to_string(),
                    parameter: key.to_string(),
                })
            } else {
                Ok(None)
            };
        }

        serde_yaml::from_value(raw.clone())
            .map(Some)
            .map_err(|cause| ConfigError::WrongType {
                group: group.to_string(),
                parameter: key.to_string(),
                cause: cause.to_string(),
            })
    }

    /// Deserializes an entire group into a typed struct.
    ///
    /// # Errors
    /// [`ConfigError::MissingGroup`] if absent, [`ConfigError::WrongType`] if the
    /// group does not match the shape of `T`.
    pub fn get_group<T: DeserializeOwned>(&self, group: &str) -> Result<T, ConfigError> {
        let group_value =
            self.groups
                .get(group)
                .ok_or_else(|| ConfigError::MissingGroup {
                    group: group.to_string(),
                })?;
        serde_yaml::from_value(group_value.clone()).map_err(|cause| ConfigError::WrongType {
            group: group.to_string(),
            parameter: "<whole group>".to_string(),
            cause: cause.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
data_retrieval_layer:
  source_identifier: pilatus-files
  num_frames_in_event_to_process: 2
  fallback_beam_energy_in_eV: 9500.0
processing_layer:
  hit_threshold: 10
"#;

    #[test]
    fn required_present_key_roundtrips() {
        let tree = ConfigTree::from_str(DOC).unwrap();
        let id: String = tree
            .get("data_retrieval_layer", "source_identifier", true)
            .unwrap()
            .unwrap();
        assert_eq!(id, "pilatus-files");
    }

    #[test]
    fn optional_absent_key_is_none() {
        let tree = ConfigTree::from_str(DOC).unwrap();
        let v: Option<String> = tree
            .get("data_retrieval_layer", "psana_calibration_directory", false)
            .unwrap();
        assert!(v.is_none());
    }

    #[test]
    fn required_absent_key_is_error() {
        let tree = ConfigTree::from_str(DOC).unwrap();
        let err = tree
            .get::<String>("data_retrieval_layer", "psana_calibration_directory", true)
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingParameter { .. }));
    }

    #[test]
    fn missing_group_is_error_even_when_not_required() {
        let tree = ConfigTree::from_str(DOC).unwrap();
        let err = tree
            .get::<String>("parallelization_layer", "pool_size_hint", false)
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingGroup { .. }));
    }

    #[test]
    fn wrong_type_is_error() {
        let tree = ConfigTree::from_str(DOC).unwrap();
        let err = tree
            .get::<u32>("data_retrieval_layer", "source_identifier", true)
            .unwrap_err();
        assert!(matches!(err, ConfigError::WrongType { .. }));
    }

    #[test]
    fn syntax_error_is_reported() {
        let err = ConfigTree::from_str("not: [valid: yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Syntax { .. }));
    }
}
