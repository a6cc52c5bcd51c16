//! Hardware abstraction layer for line-oriented serial links
//!
//! Provides the byte transport trait, a real serial implementation,
//! a scripted mock for tests, and port enumeration.

pub mod transport;
pub mod serial;
pub mod mock;
pub mod discovery;
pub mod error;

pub use transport::{decode_line, ByteTransport, TransportConfig, TransportOpener, TransportStatus};
pub use serial::{SerialOpener, SerialTransport};
pub use mock::{MockFallback, MockLog, MockOpener, MockTraffic, MockReply, MockTransport};
pub use discovery::{find_usb_port, list_ports, select_usb_port, PortInfo, PortKind, FTDI_VID};
pub use error::{CommError, CommResult, RecoveryStrategy};
