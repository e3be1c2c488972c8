use thiserror::Error;

/// Errors raised while loading or validating vehicle configuration.
///
/// The simulation core itself never fails: stale handles are no-ops and
/// stages skip computations whose inputs are undefined.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    File(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid vehicle configuration: {0}")]
    Validation(String),
}
