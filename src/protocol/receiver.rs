//! Reflector counterpart to the reliable sender

use crate::hardware::{ByteTransport, CommResult, TransportConfig, TransportOpener};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};

/// What the receiver does with each line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverMode {
    /// Write every non-empty line straight back
    Echo,
    /// Only report what arrives
    Monitor,
}

/// Counters for one receiver run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EchoStats {
    pub received: u64,
    pub echoed: u64,
    pub timeouts: u64,
}

/// Reads lines from a transport and optionally echoes them back
pub struct EchoReceiver<T: ByteTransport> {
    transport: T,
    mode: ReceiverMode,
    stats: EchoStats,
}

impl<T: ByteTransport> EchoReceiver<T> {
    pub fn new(transport: T, mode: ReceiverMode) -> Self {
        Self {
            transport,
            mode,
            stats: EchoStats::default(),
        }
    }

    pub fn echo(transport: T) -> Self {
        Self::new(transport, ReceiverMode::Echo)
    }

    pub fn monitor(transport: T) -> Self {
        Self::new(transport, ReceiverMode::Monitor)
    }

    pub fn stats(&self) -> EchoStats {
        self.stats
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Read one line. Returns the text if something arrived.
    pub fn poll_once(&mut self) -> CommResult<Option<String>> {
        let line = self.transport.read_line()?;
        if line.is_empty() {
            self.stats.timeouts += 1;
            return Ok(None);
        }

        self.stats.received += 1;
        info!("Received: {}", line);

        if self.mode == ReceiverMode::Echo {
            self.transport.write_line(&line)?;
            self.stats.echoed += 1;
            debug!("Echoed {:?} on {}", line, self.transport.port_name());
        }

        Ok(Some(line))
    }

    /// Poll until `should_stop` returns true or the channel fails.
    /// The transport is closed on every exit path.
    pub fn run_until<F>(&mut self, mut should_stop: F) -> CommResult<EchoStats>
    where
        F: FnMut(&EchoStats) -> bool,
    {
        info!(
            "Listening on {} ({:?} mode)",
            self.transport.port_name(),
            self.mode
        );

        let result = loop {
            if should_stop(&self.stats) {
                break Ok(self.stats);
            }
            if let Err(e) = self.poll_once() {
                warn!("Receiver stopped: {}", e);
                break Err(e);
            }
        };

        self.transport.close();
        let status = self.transport.status();
        info!(
            "Closed {}: {} line(s) read, {} written, {} timeout(s), {} error(s)",
            status.port, status.lines_read, status.lines_written, status.timeouts, status.error_count
        );
        result
    }

    /// Poll until `stop` is set
    pub fn run(&mut self, stop: &AtomicBool) -> CommResult<EchoStats> {
        self.run_until(|_| stop.load(Ordering::SeqCst))
    }
}

/// Open a port and wrap it in a receiver
pub fn open_receiver<O: TransportOpener>(
    opener: &mut O,
    config: &TransportConfig,
    mode: ReceiverMode,
) -> CommResult<EchoReceiver<O::Transport>> {
    let transport = opener.open(config)?;
    Ok(EchoReceiver::new(transport, mode))
}
