//! Serial/UART transport backed by the `serialport` crate

use crate::hardware::{
    decode_line, ByteTransport, CommError, CommResult, RecoveryStrategy, TransportConfig,
    TransportOpener, TransportStatus,
};
use crate::core::LINE_DELIMITER;
use log::{debug, trace, warn};
use serialport::SerialPort;
use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

const READ_CHUNK: usize = 64;

/// Serial transport over an OS serial device
pub struct SerialTransport {
    port_name: String,
    port: Option<Box<dyn SerialPort>>,
    status: TransportStatus,
    read_timeout: Duration,
    read_buffer: Vec<u8>,
}

impl SerialTransport {
    /// Open the port described by `config`
    pub fn open(config: &TransportConfig) -> CommResult<Self> {
        config.validate()?;

        let port = serialport::new(config.port.as_str(), config.baud_rate)
            .timeout(config.read_timeout())
            .open()
            .map_err(|e| CommError::PortOpen {
                port: config.port.clone(),
                reason: e.to_string(),
            })?;

        debug!(
            "Opened {} at {} baud (read timeout {}ms)",
            config.port, config.baud_rate, config.read_timeout_ms
        );

        Ok(Self::from_port(&config.port, port, config.read_timeout()))
    }

    /// Wrap an already opened port
    pub fn from_port(port_name: &str, port: Box<dyn SerialPort>, read_timeout: Duration) -> Self {
        let mut status = TransportStatus::new(port_name);
        status.open = true;

        Self {
            port_name: port_name.to_string(),
            port: Some(port),
            status,
            read_timeout,
            read_buffer: Vec::with_capacity(256),
        }
    }

    /// Take one complete line out of the buffer, if there is one
    fn take_buffered_line(&mut self) -> Option<String> {
        let end = self.read_buffer.iter().position(|&b| b == LINE_DELIMITER)?;
        let line: Vec<u8> = self.read_buffer.drain(..=end).collect();
        Some(decode_line(&line))
    }

    fn fail(&mut self, err: CommError) -> CommError {
        self.status.error_count += 1;
        if err.is_channel_fatal() {
            warn!("{}; closing port", err);
            self.close();
        }
        err
    }
}

impl ByteTransport for SerialTransport {
    fn port_name(&self) -> &str {
        &self.port_name
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn write(&mut self, bytes: &[u8]) -> CommResult<()> {
        let port = match self.port.as_mut() {
            Some(port) => port,
            None => {
                return Err(CommError::ConnectionLost {
                    port: self.port_name.clone(),
                })
            }
        };

        let result = port.write_all(bytes).and_then(|_| port.flush());
        match result {
            Ok(()) => {
                self.status.lines_written += 1;
                trace!("{} <- {:?}", self.port_name, String::from_utf8_lossy(bytes));
                Ok(())
            }
            Err(e) => {
                let err = CommError::io(&self.port_name, &e);
                Err(self.fail(err))
            }
        }
    }

    fn read_line(&mut self) -> CommResult<String> {
        if self.port.is_none() {
            return Err(CommError::ConnectionLost {
                port: self.port_name.clone(),
            });
        }

        let deadline = Instant::now() + self.read_timeout;
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            if let Some(line) = self.take_buffered_line() {
                self.status.lines_read += 1;
                trace!("{} -> {:?}", self.port_name, line);
                return Ok(line);
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }

            let read = match self.port.as_mut() {
                Some(port) => {
                    if let Err(e) = port.set_timeout(deadline - now) {
                        let err = CommError::Io {
                            port: self.port_name.clone(),
                            reason: e.to_string(),
                        };
                        return Err(self.fail(err));
                    }
                    port.read(&mut chunk)
                }
                None => {
                    return Err(CommError::ConnectionLost {
                        port: self.port_name.clone(),
                    })
                }
            };

            match read {
                Ok(n) => self.read_buffer.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::TimedOut => {
                    let err = CommError::Timeout {
                        timeout_ms: self.read_timeout.as_millis() as u64,
                    };
                    match err.recovery_strategy() {
                        RecoveryStrategy::TreatAsEmpty => break,
                        RecoveryStrategy::Abort => return Err(self.fail(err)),
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    let err = CommError::io(&self.port_name, &e);
                    return Err(self.fail(err));
                }
            }
        }

        // Timed out: hand back whatever partial text arrived
        self.status.timeouts += 1;
        let partial = decode_line(&self.read_buffer);
        self.read_buffer.clear();
        Ok(partial)
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            debug!("Closed {}", self.port_name);
        }
        self.status.open = false;
        self.read_buffer.clear();
    }

    fn status(&self) -> TransportStatus {
        self.status.clone()
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        self.close();
    }
}

/// Opens real serial ports
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialOpener;

impl TransportOpener for SerialOpener {
    type Transport = SerialTransport;

    fn open(&mut self, config: &TransportConfig) -> CommResult<SerialTransport> {
        SerialTransport::open(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_rejects_invalid_config() {
        let config = TransportConfig::serial("", 115200);
        assert!(matches!(
            SerialTransport::open(&config),
            Err(CommError::PortOpen { .. })
        ));

        let config = TransportConfig::serial("/dev/ttyUSB0", 0);
        assert!(SerialOpener.open(&config).is_err());
    }

    #[test]
    fn test_open_missing_device() {
        let config = TransportConfig::serial("/dev/serial-ack-does-not-exist", 115200);
        let result = SerialTransport::open(&config);
        assert!(matches!(result, Err(CommError::PortOpen { .. })));
    }

    #[cfg(unix)]
    mod pty {
        use crate::hardware::{ByteTransport, CommError, SerialTransport};
        use serialport::{SerialPort, TTYPort};
        use std::io::{ErrorKind, Read, Write};
        use std::time::{Duration, Instant};

        fn pty_link(read_timeout_ms: u64) -> (TTYPort, SerialTransport) {
            let (remote, local) = TTYPort::pair().unwrap();
            let transport = SerialTransport::from_port(
                "pty",
                Box::new(local),
                Duration::from_millis(read_timeout_ms),
            );
            (remote, transport)
        }

        fn read_remote(remote: &mut TTYPort, until: &str) -> String {
            remote.set_timeout(Duration::from_millis(100)).unwrap();
            let deadline = Instant::now() + Duration::from_secs(2);
            let mut received = Vec::new();
            let mut chunk = [0u8; 32];
            while Instant::now() < deadline && !String::from_utf8_lossy(&received).ends_with(until) {
                match remote.read(&mut chunk) {
                    Ok(n) => received.extend_from_slice(&chunk[..n]),
                    Err(e) if e.kind() == ErrorKind::TimedOut => continue,
                    Err(e) => panic!("remote read failed: {}", e),
                }
            }
            String::from_utf8_lossy(&received).to_string()
        }

        #[test]
        fn test_two_lines_in_one_read() {
            let (mut remote, mut transport) = pty_link(300);
            remote.write_all(b"PONG\nPING\n").unwrap();
            remote.flush().unwrap();

            assert_eq!(transport.read_line().unwrap(), "PONG");
            assert_eq!(transport.read_line().unwrap(), "PING");
            assert_eq!(transport.status().lines_read, 2);
        }

        #[test]
        fn test_timeout_yields_empty_then_partial() {
            let (mut remote, mut transport) = pty_link(300);

            let start = Instant::now();
            assert_eq!(transport.read_line().unwrap(), "");
            let elapsed = start.elapsed();
            assert!(elapsed >= Duration::from_millis(250));
            assert!(elapsed < Duration::from_millis(550));

            remote.write_all(b"PAR").unwrap();
            remote.flush().unwrap();
            assert_eq!(transport.read_line().unwrap(), "PAR");
            assert_eq!(transport.status().timeouts, 2);
        }

        #[test]
        fn test_write_line_framing() {
            let (mut remote, mut transport) = pty_link(300);
            transport.write_line("ECHO").unwrap();

            let received = read_remote(&mut remote, "ECHO\n");
            assert!(received.ends_with("ECHO\n"), "received {:?}", received);
            assert_eq!(transport.status().lines_written, 1);
        }

        #[test]
        fn test_close_twice_then_read() {
            let (_remote, mut transport) = pty_link(300);
            assert!(transport.is_open());

            transport.close();
            transport.close();
            assert!(!transport.is_open());
            assert!(!transport.status().open);
            assert!(matches!(
                transport.read_line(),
                Err(CommError::ConnectionLost { .. })
            ));
            assert!(matches!(
                transport.write_line("late"),
                Err(CommError::ConnectionLost { .. })
            ));
        }
    }
}
