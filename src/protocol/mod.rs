//! Acknowledgment protocol: reliable sender and its echo counterpart

pub mod delay;
pub mod error;
pub mod receiver;
pub mod sender;

pub use delay::{Delay, RecordingDelay, ThreadDelay};
pub use error::{SendError, SendResult};
pub use receiver::{open_receiver, EchoReceiver, EchoStats, ReceiverMode};
pub use sender::{check_payload, send_serial_data, ReliableSender};
