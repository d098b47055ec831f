//! # Runtime Configuration
//!
//! The merged configuration an [`Agent`](crate::lifecycle::Agent) is initialized
//! with. Field names on the wire follow the agent's historical camelCase layout
//! (`catchExceptions`, `apmOptions`, ...), so hosts can deserialize it straight
//! from their own config documents.
//!
//! When `init` is called without a config, [`RuntimeConfig::from_env`] derives one
//! from the process environment. Standalone mode is selected only when all three
//! credential variables are present.

pub mod error;

pub use error::ConfigError;

use serde::{Deserialize, Serialize};

/// Environment variable holding the backend secret key.
pub const SECRET_KEY_VAR: &str = "PM2_SECRET_KEY";
/// Environment variable holding the backend public key.
pub const PUBLIC_KEY_VAR: &str = "PM2_PUBLIC_KEY";
/// Environment variable holding the application name.
pub const APP_NAME_VAR: &str = "PM2_APP_NAME";

/// Credentials used in standalone mode to talk to the backend directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApmOptions {
    pub secret_key: String,
    pub public_key: String,
    pub app_name: String,
}

/// Which built-in metric families are enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MetricsConfig {
    pub v8: bool,
    pub network: bool,
    pub event_loop: bool,
    pub runtime: bool,
    pub http: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            v8: true,
            network: false,
            event_loop: true,
            runtime: true,
            http: true,
        }
    }
}

/// Tracing switches. `outbound` controls export of root client spans.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    pub enabled: bool,
    pub outbound: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RuntimeConfig {
    pub catch_exceptions: bool,
    pub profiling: bool,
    pub standalone: bool,
    pub metrics: MetricsConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apm_options: Option<ApmOptions>,
    pub tracing: TracingConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            catch_exceptions: true,
            profiling: true,
            standalone: false,
            metrics: MetricsConfig::default(),
            apm_options: None,
            tracing: TracingConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Default configuration with standalone credentials taken from the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Same as [`RuntimeConfig::from_env`] but reads variables through `lookup`.
    ///
    /// Empty values count as missing.
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.is_empty());
        let apm_options = match (var(SECRET_KEY_VAR), var(PUBLIC_KEY_VAR), var(APP_NAME_VAR)) {
            (Some(secret_key), Some(public_key), Some(app_name)) => Some(ApmOptions {
                secret_key,
                public_key,
                app_name,
            }),
            _ => None,
        };

        Self {
            standalone: apm_options.is_some(),
            apm_options,
            ..Self::default()
        }
    }

    /// Parses a camelCase config document. Missing fields take their defaults.
    pub fn from_json(document: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(document)?;
        if config.standalone && config.apm_options.is_none() {
            return Err(ConfigError::MissingCredentials);
        }
        Ok(config)
    }

    /// Switches to standalone mode with the given credentials.
    pub fn with_standalone(mut self, options: ApmOptions) -> Self {
        self.standalone = true;
        self.apm_options = Some(options);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_match_agent_defaults() {
        let config = RuntimeConfig::default();
        assert!(config.catch_exceptions);
        assert!(config.profiling);
        assert!(!config.standalone);
        assert!(config.metrics.v8 && config.metrics.event_loop && config.metrics.http);
        assert!(!config.metrics.network);
        assert_eq!(config.tracing, TracingConfig { enabled: false, outbound: false });
        assert!(config.apm_options.is_none());
    }

    #[test]
    fn test_all_credentials_select_standalone() {
        let config = RuntimeConfig::from_vars(vars(&[
            (SECRET_KEY_VAR, "s3cret"),
            (PUBLIC_KEY_VAR, "pub"),
            (APP_NAME_VAR, "checkout"),
        ]));
        assert!(config.standalone);
        let options = config.apm_options.unwrap();
        assert_eq!(options.app_name, "checkout");
        assert_eq!(options.secret_key, "s3cret");
    }

    #[test]
    fn test_partial_credentials_stay_ipc() {
        let config = RuntimeConfig::from_vars(vars(&[
            (SECRET_KEY_VAR, "s3cret"),
            (PUBLIC_KEY_VAR, ""),
            (APP_NAME_VAR, "checkout"),
        ]));
        assert!(!config.standalone);
        assert!(config.apm_options.is_none());
    }

    #[test]
    fn test_standalone_document_without_credentials_rejected() {
        let result = RuntimeConfig::from_json(r#"{ "standalone": true }"#);
        assert!(matches!(result, Err(ConfigError::MissingCredentials)));

        let result = RuntimeConfig::from_json("{ not json");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_deserialize_camel_case_with_defaults() {
        let config = RuntimeConfig::from_json(
            r#"{
                "catchExceptions": false,
                "metrics": { "eventLoop": false },
                "apmOptions": { "secretKey": "a", "publicKey": "b", "appName": "c" },
                "standalone": true,
                "tracing": { "enabled": true }
            }"#,
        )
        .unwrap();

        assert!(!config.catch_exceptions);
        assert!(config.profiling);
        assert!(!config.metrics.event_loop);
        assert!(config.metrics.v8);
        assert!(config.tracing.enabled);
        assert!(!config.tracing.outbound);
        assert_eq!(config.apm_options.unwrap().app_name, "c");
    }
}
