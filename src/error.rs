use thiserror::Error;

#[derive(Error, Debug)]
pub enum CheckError {
    #[error("Consul request to {url} timed out")]
    Timeout { url: String },

    #[error("Consul request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Consul request to {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Metrics error: {0}")]
    MetricsError(String),
}

impl From<prometheus::Error> for CheckError {
    fn from(e: prometheus::Error) -> Self {
        CheckError::MetricsError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CheckError>;
