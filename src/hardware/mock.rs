//! Mock transport implementation for testing and development

use crate::hardware::{
    decode_line, ByteTransport, CommError, CommResult, TransportConfig, TransportOpener,
    TransportStatus,
};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// One scripted answer from the simulated remote end
#[derive(Debug, Clone, PartialEq)]
pub enum MockReply {
    /// A line arrives (without terminator)
    Line(String),
    /// Nothing arrives before the read timeout
    Silence,
    /// The device disappears
    Disconnect,
    /// Nothing arrives and the handle ends up closed, without an error
    Hangup,
}

/// What the remote does once the script runs out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFallback {
    /// Reflect the last line written, like a real echo receiver
    Echo,
    /// Never answer
    Silence,
}

/// Traffic recorded across every handle opened from the same script
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MockLog {
    pub opens: u32,
    pub written: Vec<String>,
    pub reads: u32,
    pub close_calls: u32,
    pub closes: u32,
}

/// Shared view onto a mock link's recorded traffic
#[derive(Debug, Default, Clone)]
pub struct MockTraffic {
    log: Rc<RefCell<MockLog>>,
}

impl MockTraffic {
    pub fn written_lines(&self) -> Vec<String> {
        self.log.borrow().written.clone()
    }

    pub fn writes(&self) -> usize {
        self.log.borrow().written.len()
    }

    pub fn reads(&self) -> u32 {
        self.log.borrow().reads
    }

    /// Number of times `close` was called
    pub fn close_calls(&self) -> u32 {
        self.log.borrow().close_calls
    }

    /// Number of open→closed transitions
    pub fn closes(&self) -> u32 {
        self.log.borrow().closes
    }

    pub fn opens(&self) -> u32 {
        self.log.borrow().opens
    }
}

/// Mock transport for testing and development
pub struct MockTransport {
    port_name: String,
    open: bool,
    replies: VecDeque<MockReply>,
    fallback: MockFallback,
    last_written: Option<String>,
    fail_writes: bool,
    status: TransportStatus,
    traffic: MockTraffic,
}

impl MockTransport {
    /// Create an open mock transport that echoes by default
    pub fn new(port_name: &str) -> Self {
        let mut status = TransportStatus::new(port_name);
        status.open = true;

        Self {
            port_name: port_name.to_string(),
            open: true,
            replies: VecDeque::new(),
            fallback: MockFallback::Echo,
            last_written: None,
            fail_writes: false,
            status,
            traffic: MockTraffic::default(),
        }
    }

    /// Queue a scripted reply
    pub fn push_reply(&mut self, reply: MockReply) {
        self.replies.push_back(reply);
    }

    /// Queue an incoming line
    pub fn push_line(&mut self, line: &str) {
        self.replies.push_back(MockReply::Line(line.to_string()));
    }

    pub fn set_fallback(&mut self, fallback: MockFallback) {
        self.fallback = fallback;
    }

    /// Make every subsequent write fail and drop the channel
    pub fn fail_writes(&mut self, enable: bool) {
        self.fail_writes = enable;
    }

    /// Simulate the device going away without a close call
    pub fn disconnect(&mut self) {
        self.open = false;
        self.status.open = false;
    }

    pub fn traffic(&self) -> MockTraffic {
        self.traffic.clone()
    }

    pub fn queued_reply_count(&self) -> usize {
        self.replies.len()
    }

    fn lost(&self) -> CommError {
        CommError::ConnectionLost {
            port: self.port_name.clone(),
        }
    }
}

impl ByteTransport for MockTransport {
    fn port_name(&self) -> &str {
        &self.port_name
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn write(&mut self, bytes: &[u8]) -> CommResult<()> {
        if !self.open {
            return Err(self.lost());
        }

        if self.fail_writes {
            self.status.error_count += 1;
            self.disconnect();
            return Err(CommError::Io {
                port: self.port_name.clone(),
                reason: "Simulated write failure".to_string(),
            });
        }

        let line = decode_line(bytes);
        self.traffic.log.borrow_mut().written.push(line.clone());
        self.last_written = Some(line);
        self.status.lines_written += 1;
        Ok(())
    }

    fn read_line(&mut self) -> CommResult<String> {
        if !self.open {
            return Err(self.lost());
        }

        self.traffic.log.borrow_mut().reads += 1;

        let reply = match self.replies.pop_front() {
            Some(reply) => reply,
            None => match self.fallback {
                MockFallback::Echo => match self.last_written.take() {
                    Some(line) => MockReply::Line(line),
                    None => MockReply::Silence,
                },
                MockFallback::Silence => MockReply::Silence,
            },
        };

        match reply {
            MockReply::Line(line) => {
                self.status.lines_read += 1;
                Ok(line)
            }
            MockReply::Silence => {
                self.status.timeouts += 1;
                Ok(String::new())
            }
            MockReply::Disconnect => {
                self.status.error_count += 1;
                self.disconnect();
                Err(self.lost())
            }
            MockReply::Hangup => {
                self.disconnect();
                Ok(String::new())
            }
        }
    }

    fn close(&mut self) {
        let mut log = self.traffic.log.borrow_mut();
        log.close_calls += 1;
        if self.status.open || self.open {
            log.closes += 1;
        }
        self.open = false;
        self.status.open = false;
    }

    fn status(&self) -> TransportStatus {
        self.status.clone()
    }
}

/// Hands out mock transports that all follow the same script
#[derive(Debug, Clone)]
pub struct MockOpener {
    replies: Vec<MockReply>,
    fallback: MockFallback,
    fail_writes: bool,
    open_error: Option<String>,
    traffic: MockTraffic,
}

impl MockOpener {
    /// Opener whose remote echoes every line
    pub fn echoing() -> Self {
        Self {
            replies: Vec::new(),
            fallback: MockFallback::Echo,
            fail_writes: false,
            open_error: None,
            traffic: MockTraffic::default(),
        }
    }

    /// Opener whose remote plays `replies` and then stays silent
    pub fn scripted(replies: Vec<MockReply>) -> Self {
        Self {
            replies,
            fallback: MockFallback::Silence,
            ..Self::echoing()
        }
    }

    /// Opener that cannot open the port
    pub fn unavailable(reason: &str) -> Self {
        Self {
            open_error: Some(reason.to_string()),
            ..Self::echoing()
        }
    }

    pub fn with_fallback(mut self, fallback: MockFallback) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn traffic(&self) -> MockTraffic {
        self.traffic.clone()
    }
}

impl TransportOpener for MockOpener {
    type Transport = MockTransport;

    fn open(&mut self, config: &TransportConfig) -> CommResult<MockTransport> {
        if let Some(reason) = &self.open_error {
            return Err(CommError::PortOpen {
                port: config.port.clone(),
                reason: reason.clone(),
            });
        }

        self.traffic.log.borrow_mut().opens += 1;

        let mut transport = MockTransport::new(&config.port);
        transport.replies = self.replies.iter().cloned().collect();
        transport.fallback = self.fallback;
        transport.fail_writes = self.fail_writes;
        transport.traffic = self.traffic.clone();
        Ok(transport)
    }
}
