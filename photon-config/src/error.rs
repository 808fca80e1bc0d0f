//! Errors specific to configuration loading and lookup, distinct from the fabric's
//! general error taxonomy so a caller can match on the precise cause before
//! converting into [`photon_core::PhotonError`].

/// Failure modes for [`crate::ConfigTree`] operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be opened or read.
    #[error("cannot read configuration file '{path}': {cause}")]
    Unreadable {
        /// Path that was requested.
        path: String,
        /// Underlying I/O error description.
        cause: String,
    },

    /// The file was read but is not valid YAML.
    #[error("syntax error in configuration file: {cause}")]
    Syntax {
        /// Parser error description.
        cause: String,
    },

    /// A requested parameter group does not exist.
    #[error("parameter group '{group}' is not in the configuration file")]
    MissingGroup {
        /// Group name that was requested.
        group: String,
    },

    /// A required parameter is absent from an otherwise-present group.
    #[error("parameter '{parameter}' in group '{group}' was not found, but is required")]
    MissingParameter {
        /// Group the parameter was looked up in.
        group: String,
        /// Parameter name.
        parameter: String,
    },

    /// A parameter was present but did not deserialize to the requested type.
    #[error("wrong type for parameter '{parameter}' in group '{group}': {cause}")]
    WrongType {
        /// Group the parameter was looked up in.
        group: String,
        /// Parameter name.
        parameter: String,
        /// Deserialization error description.
        cause: String,
    },
}

impl From<ConfigError> for photon_core::PhotonError {
    fn from(value: ConfigError) -> Self {
        photon_core::PhotonError::config(value.to_string())
    }
}
