//! Terminal failures of a reliable send

use crate::core::Delivery;
use crate::hardware::CommError;
use thiserror::Error;

/// Why a send did not deliver its payload
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SendError {
    /// Port could not be opened or died mid-operation
    #[error("Serial port {port} not available: {source}")]
    ChannelUnavailable { port: String, source: CommError },
    /// Every attempt came back without a matching echo
    #[error("Failed to transmit after retries ({attempts} attempts).")]
    RetriesExhausted { attempts: u32 },
    /// Payload cannot be carried as a single line
    #[error("Invalid payload: {reason}")]
    InvalidPayload { reason: String },
    /// Send parameters violate a precondition
    #[error("Invalid send request: {parameter} = {value}")]
    InvalidRequest { parameter: String, value: String },
}

/// Outcome of a reliable send
pub type SendResult = Result<Delivery, SendError>;
