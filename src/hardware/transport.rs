//! Byte transport interface trait and configuration

use crate::core::{DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT_MS, LINE_DELIMITER};
use crate::hardware::{CommError, CommResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Hardware abstraction trait for an opened, line-oriented byte channel
pub trait ByteTransport {
    /// Identifier of the underlying port
    fn port_name(&self) -> &str;

    /// Whether the handle can still carry traffic
    fn is_open(&self) -> bool;

    /// Write raw bytes to the channel
    fn write(&mut self, bytes: &[u8]) -> CommResult<()>;

    /// Read one line, blocking up to the configured read timeout.
    /// Returns the decoded text without its terminator, or an empty
    /// string when nothing arrived in time.
    fn read_line(&mut self) -> CommResult<String>;

    /// Close the handle. Safe to call more than once.
    fn close(&mut self);

    /// Get current transport status
    fn status(&self) -> TransportStatus;

    /// Write `line` followed by a single delimiter
    fn write_line(&mut self, line: &str) -> CommResult<()> {
        let mut framed = Vec::with_capacity(line.len() + 1);
        framed.extend_from_slice(line.as_bytes());
        framed.push(LINE_DELIMITER);
        self.write(&framed)
    }
}

/// Factory producing open transports, one per operation
pub trait TransportOpener {
    type Transport: ByteTransport;

    /// Open a fresh handle, or fail with a channel error
    fn open(&mut self, config: &TransportConfig) -> CommResult<Self::Transport>;
}

/// Transport status information
#[derive(Debug, Clone, PartialEq)]
pub struct TransportStatus {
    pub port: String,
    pub open: bool,
    pub lines_written: u32,
    pub lines_read: u32,
    pub timeouts: u32,
    pub error_count: u32,
}

impl TransportStatus {
    pub fn new(port: &str) -> Self {
        Self {
            port: port.to_string(),
            open: false,
            lines_written: 0,
            lines_read: 0,
            timeouts: 0,
            error_count: 0,
        }
    }
}

/// Parameters needed to open a transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Port identifier, e.g. `/dev/ttyUSB0` or `COM11`
    pub port: String,
    /// Line rate; both ends must agree
    pub baud_rate: u32,
    /// Upper bound on a single line read (milliseconds)
    pub read_timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
        }
    }
}

impl TransportConfig {
    pub fn serial(port: &str, baud_rate: u32) -> Self {
        Self {
            port: port.to_string(),
            baud_rate,
            ..Default::default()
        }
    }

    pub fn with_read_timeout_ms(mut self, read_timeout_ms: u64) -> Self {
        self.read_timeout_ms = read_timeout_ms;
        self
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn validate(&self) -> CommResult<()> {
        if self.port.trim().is_empty() {
            return Err(CommError::PortOpen {
                port: self.port.clone(),
                reason: "empty port name".to_string(),
            });
        }
        if self.baud_rate == 0 {
            return Err(CommError::PortOpen {
                port: self.port.clone(),
                reason: "baud rate must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Decode one received line: lossy UTF-8, line terminators stripped
pub fn decode_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches(['\r', '\n'])
        .to_string()
}
