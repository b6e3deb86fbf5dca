use std::env;

use thiserror::Error;

/// Which backend the app talks to
#[derive(Debug)]
pub enum BackendKind {
    /// The in-process backend with seeded demo data
    Memory,
    /// A hosted backend reached over HTTP
    Rest { base_url: String, api_key: String },
}

#[derive(Debug)]
pub struct Config {
    pub backend: BackendKind,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("KICKABOUT_BACKEND must be \"memory\" or \"rest\", not {0:?}")]
    UnknownBackend(String),
    #[error("{0} must be set when KICKABOUT_BACKEND is \"rest\"")]
    MissingVariable(&'static str),
}

impl Config {
    /// Reads the configuration from the environment.
    /// With nothing set, the app runs against the in-memory demo backend.
    pub fn from_env() -> Result<Self, ConfigError> {
        let kind = env::var("KICKABOUT_BACKEND").unwrap_or_else(|_| "memory".to_string());

        let backend = match kind.as_str() {
            "memory" => BackendKind::Memory,
            "rest" => BackendKind::Rest {
                base_url: require("KICKABOUT_URL")?,
                api_key: require("KICKABOUT_API_KEY")?,
            },
            other => return Err(ConfigError::UnknownBackend(other.to_string())),
        };

        Ok(Self { backend })
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingVariable(name))
}
