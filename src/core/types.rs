//! Core data types for the acknowledgment protocol

use crate::hardware::CommError;
use std::fmt;

/// Result of a single write/read round trip
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    /// The echo matched the payload
    Acknowledged,
    /// Something else came back (possibly nothing)
    Mismatched { received: String },
    /// The handle is closed or the device failed
    ChannelUnavailable(CommError),
}

/// Successful delivery of one payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// Round trips used, including the acknowledged one
    pub attempts: u32,
}

impl fmt::Display for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Acknowledgment matched. Transmission successful!")
    }
}
