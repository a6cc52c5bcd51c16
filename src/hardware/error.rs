//! Communication error types and handling

use thiserror::Error;

/// Communication error types for byte transports
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommError {
    /// Port could not be opened (missing device, busy, bad settings)
    #[error("Failed to open port {port}: {reason}")]
    PortOpen { port: String, reason: String },
    /// Handle was closed or the device went away
    #[error("Connection lost on port {port}")]
    ConnectionLost { port: String },
    /// Read or write failed at the OS level
    #[error("I/O error on port {port}: {reason}")]
    Io { port: String, reason: String },
    /// No complete line arrived within the read timeout
    #[error("Communication timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    /// Port enumeration failed
    #[error("Port enumeration failed: {reason}")]
    Enumeration { reason: String },
}

/// Result type for communication operations
pub type CommResult<T> = Result<T, CommError>;

/// How a caller should react to a communication failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStrategy {
    /// Nothing arrived; treat as an empty line and carry on
    TreatAsEmpty,
    /// The channel is unusable for the rest of the operation
    Abort,
}

impl CommError {
    /// Get the recommended recovery strategy for this error
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        match self {
            CommError::Timeout { .. } => RecoveryStrategy::TreatAsEmpty,
            CommError::PortOpen { .. }
            | CommError::ConnectionLost { .. }
            | CommError::Io { .. }
            | CommError::Enumeration { .. } => RecoveryStrategy::Abort,
        }
    }

    /// True when the channel can no longer be used
    pub fn is_channel_fatal(&self) -> bool {
        matches!(self.recovery_strategy(), RecoveryStrategy::Abort)
    }

    pub(crate) fn io(port: &str, err: &std::io::Error) -> Self {
        CommError::Io {
            port: port.to_string(),
            reason: err.to_string(),
        }
    }
}
