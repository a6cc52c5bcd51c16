//! Link timing and protocol constants

/// Line rate used by both ends unless configured otherwise
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Pause after opening a port before any traffic (milliseconds)
pub const DEFAULT_SETTLE_MS: u64 = 2000;

/// Pause between writing a payload and reading the echo (milliseconds)
pub const DEFAULT_RESPONSE_WAIT_MS: u64 = 500;

/// Pause after a mismatched echo before the next attempt (milliseconds)
pub const DEFAULT_BACKOFF_MS: u64 = 1000;

/// Upper bound on a single line read (milliseconds)
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1000;

/// Round trips allowed per send
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Terminator appended to every written line
pub const LINE_DELIMITER: u8 = b'\n';
