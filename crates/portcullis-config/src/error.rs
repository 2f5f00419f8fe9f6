//! Configuration error types.

/// Result type alias for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// No config file was given and none was found in the default locations.
    #[error("no config file found (searched: {searched}); pass --config or set PORTCULLIS_CONFIG")]
    NotFound { searched: String },

    /// Failed to parse TOML.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Failed to parse YAML.
    #[error("failed to parse YAML config: {0}")]
    ParseYaml(String),

    /// Missing required field.
    #[error("missing required field '{0}'")]
    MissingField(String),

    /// A field holds a value that fails validation.
    #[error("invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// An environment override could not be applied.
    #[error("invalid environment override {var}: {message}")]
    InvalidOverride { var: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}
