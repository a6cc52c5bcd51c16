//! Serial Acknowledgment Link
//!
//! Confirm-or-retry delivery of text lines over a serial port: the remote
//! echoes each line back and the sender retries until the echo matches.

pub mod core;
pub mod hardware;
pub mod protocol;
pub mod utils;

// Re-export commonly used types
pub use self::core::{AttemptOutcome, Delivery};
pub use hardware::{
    ByteTransport, CommError, CommResult, MockOpener, MockTransport, PortInfo, SerialOpener,
    SerialTransport, TransportConfig, TransportOpener,
};
pub use protocol::{
    send_serial_data, EchoReceiver, EchoStats, ReceiverMode, ReliableSender, SendError,
    SendResult,
};
pub use utils::{ConfigError, LinkConfig, LinkTimings};
