use crate::core::{
    DEFAULT_BACKOFF_MS, DEFAULT_BAUD_RATE, DEFAULT_MAX_ATTEMPTS, DEFAULT_READ_TIMEOUT_MS,
    DEFAULT_RESPONSE_WAIT_MS, DEFAULT_SETTLE_MS,
};
use crate::hardware::TransportConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Named delays used by the send loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkTimings {
    /// Pause after opening the port so the line can stabilise (milliseconds)
    pub settle_ms: u64,
    /// Pause between writing and reading the echo (milliseconds)
    pub response_wait_ms: u64,
    /// Pause after a mismatched echo (milliseconds)
    pub backoff_ms: u64,
    /// Upper bound on one line read (milliseconds)
    pub read_timeout_ms: u64,
}

impl Default for LinkTimings {
    fn default() -> Self {
        Self {
            settle_ms: DEFAULT_SETTLE_MS,
            response_wait_ms: DEFAULT_RESPONSE_WAIT_MS,
            backoff_ms: DEFAULT_BACKOFF_MS,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
        }
    }
}

impl LinkTimings {
    /// All delays zero; for tests and simulated links
    pub fn immediate() -> Self {
        Self {
            settle_ms: 0,
            response_wait_ms: 0,
            backoff_ms: 0,
            read_timeout_ms: 0,
        }
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn response_wait(&self) -> Duration {
        Duration::from_millis(self.response_wait_ms)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// Link configuration, as stored in a JSON file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Port identifier, e.g. `/dev/ttyUSB0` or `COM11`
    pub port: String,
    /// Line rate shared by both ends
    pub baud_rate: u32,
    /// Round trips allowed per send
    pub max_attempts: u32,
    pub timings: LinkTimings,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            timings: LinkTimings::default(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Invalid parameter value
    #[error("Invalid {parameter} = {value}: {reason}")]
    InvalidParameter { parameter: String, value: String, reason: String },
    /// Configuration file I/O error
    #[error("{message}")]
    Io { message: String },
    /// JSON serialization/deserialization error
    #[error("{message}")]
    Serialization { message: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration validation result
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Validation errors
    pub errors: Vec<ConfigError>,
    /// Validation warnings
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

impl LinkConfig {
    pub fn new(port: &str, baud_rate: u32) -> Self {
        Self {
            port: port.to_string(),
            baud_rate,
            ..Default::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_timings(mut self, timings: LinkTimings) -> Self {
        self.timings = timings;
        self
    }

    /// Parameters for opening the transport
    pub fn transport(&self) -> TransportConfig {
        TransportConfig::serial(&self.port, self.baud_rate)
            .with_read_timeout_ms(self.timings.read_timeout_ms)
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = fs::read_to_string(&path).map_err(|e| ConfigError::Io {
            message: format!("Failed to read config file '{}': {}", path_str, e),
        })?;

        serde_json::from_str(&content).map_err(|e| ConfigError::Serialization {
            message: format!("Failed to parse config file '{}': {}", path_str, e),
        })
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialization {
            message: format!("Failed to serialize configuration: {}", e),
        })?;

        fs::write(&path, content).map_err(|e| ConfigError::Io {
            message: format!("Failed to write config file '{}': {}", path_str, e),
        })
    }

    /// Check every parameter, collecting all problems
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.port.trim().is_empty() {
            result.errors.push(ConfigError::InvalidParameter {
                parameter: "port".to_string(),
                value: format!("{:?}", self.port),
                reason: "port name must not be empty".to_string(),
            });
        }

        if self.baud_rate == 0 {
            result.errors.push(ConfigError::InvalidParameter {
                parameter: "baud_rate".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }

        if self.max_attempts == 0 {
            result.errors.push(ConfigError::InvalidParameter {
                parameter: "max_attempts".to_string(),
                value: "0".to_string(),
                reason: "at least one attempt is required".to_string(),
            });
        }

        if self.timings.settle_ms == 0 {
            result
                .warnings
                .push("settle_ms is 0; first payload may be lost on real hardware".to_string());
        }

        if self.timings.read_timeout_ms == 0 {
            result
                .warnings
                .push("read_timeout_ms is 0; reads will not wait for the echo".to_string());
        }

        result
    }
}
