//! Core types and constants for the serial acknowledgment link

pub mod types;
pub mod constants;

pub use types::*;
pub use constants::*;
