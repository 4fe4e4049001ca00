use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("non-finite {field} sample at tile ({x}, {y})")]
    NonFiniteSample {
        field: &'static str,
        x: i32,
        y: i32,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum LightingError {
    #[error("unknown light source type: {0}")]
    UnknownLightKind(String),
    #[error("object has neither id nor name")]
    MissingIdentity,
    #[error("object {0} has no position")]
    MissingPosition(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
