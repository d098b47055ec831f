/// Errors raised while loading a [`RuntimeConfig`](super::RuntimeConfig) document.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid config document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Standalone mode requires apmOptions")]
    MissingCredentials,
}
