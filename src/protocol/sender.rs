//! Confirm-or-retry send over a line-oriented transport
//!
//! Each send opens one transport handle, waits for the line to settle,
//! then repeats write / wait / read / compare until the remote echoes the
//! payload back or the attempt budget runs out. The handle is closed on
//! every exit path.

use crate::core::{AttemptOutcome, Delivery};
use crate::hardware::{
    ByteTransport, CommError, SerialOpener, TransportConfig, TransportOpener,
};
use crate::protocol::{Delay, SendError, SendResult, ThreadDelay};
use crate::utils::{LinkConfig, LinkTimings};
use log::{debug, error, info, warn};

/// Sends payloads and waits for them to be echoed back
pub struct ReliableSender<O: TransportOpener, D: Delay = ThreadDelay> {
    opener: O,
    delay: D,
    timings: LinkTimings,
}

impl<O: TransportOpener> ReliableSender<O, ThreadDelay> {
    /// Sender with real sleeps and default timings
    pub fn new(opener: O) -> Self {
        Self::with_delay(opener, ThreadDelay)
    }
}

impl<O: TransportOpener, D: Delay> ReliableSender<O, D> {
    pub fn with_delay(opener: O, delay: D) -> Self {
        Self {
            opener,
            delay,
            timings: LinkTimings::default(),
        }
    }

    pub fn with_timings(mut self, timings: LinkTimings) -> Self {
        self.timings = timings;
        self
    }

    pub fn delay(&self) -> &D {
        &self.delay
    }

    /// Send `payload` on `port` and wait for it to be echoed back,
    /// trying at most `max_attempts` round trips.
    pub fn send(&mut self, port: &str, rate: u32, payload: &str, max_attempts: u32) -> SendResult {
        let transport = TransportConfig::serial(port, rate)
            .with_read_timeout_ms(self.timings.read_timeout_ms);
        let timings = self.timings;
        self.send_inner(&transport, &timings, payload, max_attempts)
    }

    /// Send using port, rate, attempt budget and timings from `config`
    pub fn send_with(&mut self, config: &LinkConfig, payload: &str) -> SendResult {
        self.send_inner(&config.transport(), &config.timings, payload, config.max_attempts)
    }

    fn send_inner(
        &mut self,
        transport_config: &TransportConfig,
        timings: &LinkTimings,
        payload: &str,
        max_attempts: u32,
    ) -> SendResult {
        check_request(transport_config.baud_rate, max_attempts)?;
        check_payload(payload)?;

        let mut transport = self.opener.open(transport_config).map_err(|source| {
            error!("Could not open {}: {}", transport_config.port, source);
            SendError::ChannelUnavailable {
                port: transport_config.port.clone(),
                source,
            }
        })?;

        debug!(
            "Opened {}; settling for {}ms",
            transport_config.port, timings.settle_ms
        );
        self.delay.pause(timings.settle());

        let result = self.run_attempts(&mut transport, timings, payload, max_attempts);
        let status = transport.status();
        debug!(
            "{}: {} line(s) written, {} read, {} timeout(s)",
            status.port, status.lines_written, status.lines_read, status.timeouts
        );
        transport.close();

        match &result {
            Ok(delivery) => info!(
                "{} acknowledged {:?} after {} attempt(s)",
                transport_config.port, payload, delivery.attempts
            ),
            Err(e) => error!("{}", e),
        }
        result
    }

    fn run_attempts(
        &mut self,
        transport: &mut O::Transport,
        timings: &LinkTimings,
        payload: &str,
        max_attempts: u32,
    ) -> SendResult {
        for attempt in 1..=max_attempts {
            match self.round_trip(transport, timings, payload, attempt) {
                AttemptOutcome::Acknowledged => return Ok(Delivery { attempts: attempt }),
                AttemptOutcome::Mismatched { received } => {
                    warn!(
                        "Attempt {}/{}: acknowledgment mismatch (expected {:?}, received {:?})",
                        attempt, max_attempts, payload, received
                    );
                    if attempt < max_attempts {
                        self.delay.pause(timings.backoff());
                    }
                }
                AttemptOutcome::ChannelUnavailable(source) => {
                    return Err(SendError::ChannelUnavailable {
                        port: transport.port_name().to_string(),
                        source,
                    });
                }
            }
        }

        Err(SendError::RetriesExhausted {
            attempts: max_attempts,
        })
    }

    /// One write / wait / read / compare cycle
    fn round_trip(
        &mut self,
        transport: &mut O::Transport,
        timings: &LinkTimings,
        payload: &str,
        attempt: u32,
    ) -> AttemptOutcome {
        if !transport.is_open() {
            return AttemptOutcome::ChannelUnavailable(CommError::ConnectionLost {
                port: transport.port_name().to_string(),
            });
        }

        debug!("Attempt {}: sending {:?}", attempt, payload);
        if let Err(e) = transport.write_line(payload) {
            return AttemptOutcome::ChannelUnavailable(e);
        }

        self.delay.pause(timings.response_wait());

        let ack = match transport.read_line() {
            Ok(line) => line,
            Err(e) if !e.is_channel_fatal() => String::new(),
            Err(e) => return AttemptOutcome::ChannelUnavailable(e),
        };
        debug!("Attempt {}: received {:?}", attempt, ack);

        if ack == payload {
            AttemptOutcome::Acknowledged
        } else {
            AttemptOutcome::Mismatched { received: ack }
        }
    }
}

fn check_request(rate: u32, max_attempts: u32) -> Result<(), SendError> {
    if rate == 0 {
        return Err(SendError::InvalidRequest {
            parameter: "rate".to_string(),
            value: rate.to_string(),
        });
    }
    if max_attempts == 0 {
        return Err(SendError::InvalidRequest {
            parameter: "max_attempts".to_string(),
            value: max_attempts.to_string(),
        });
    }
    Ok(())
}

/// Reject payloads that cannot travel as exactly one line
pub fn check_payload(payload: &str) -> Result<(), SendError> {
    if let Some(c) = payload.chars().find(|c| matches!(c, '\n' | '\r')) {
        return Err(SendError::InvalidPayload {
            reason: format!("contains line delimiter {:?}", c),
        });
    }
    Ok(())
}

/// Send over a real serial port with default timings
pub fn send_serial_data(port: &str, rate: u32, payload: &str, max_attempts: u32) -> SendResult {
    ReliableSender::new(SerialOpener).send(port, rate, payload, max_attempts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::{MockFallback, MockOpener, MockReply};
    use crate::protocol::RecordingDelay;
    use std::time::Duration;

    fn quick_sender(opener: MockOpener) -> ReliableSender<MockOpener, RecordingDelay> {
        ReliableSender::with_delay(opener, RecordingDelay::new())
    }

    #[test]
    fn test_ping_acknowledged_first_attempt() {
        let opener = MockOpener::echoing();
        let traffic = opener.traffic();
        let mut sender = quick_sender(opener);

        let delivery = sender.send("COM11", 115200, "PING", 5).unwrap();
        assert_eq!(delivery.attempts, 1);
        assert_eq!(traffic.written_lines(), vec!["PING".to_string()]);
        assert_eq!(traffic.reads(), 1);
        assert_eq!(traffic.close_calls(), 1);
    }

    #[test]
    fn test_pong_exhausts_retries() {
        // The remote would echo correctly on a fourth attempt
        let opener = MockOpener::scripted(vec![
            MockReply::Line("PONG".to_string());
            3
        ])
        .with_fallback(MockFallback::Echo);
        let traffic = opener.traffic();
        let mut sender = quick_sender(opener);

        let result = sender.send("COM11", 115200, "PING", 3);
        assert_eq!(result, Err(SendError::RetriesExhausted { attempts: 3 }));
        assert_eq!(traffic.writes(), 3);
        assert_eq!(traffic.reads(), 3);
        assert_eq!(traffic.close_calls(), 1);
    }

    #[test]
    fn test_empty_payload_is_legal() {
        let opener = MockOpener::scripted(vec![MockReply::Line(String::new())]);
        let traffic = opener.traffic();
        let mut sender = quick_sender(opener);

        let delivery = sender.send("COM11", 115200, "", 5).unwrap();
        assert_eq!(delivery.attempts, 1);
        assert_eq!(traffic.written_lines(), vec![String::new()]);
    }

    #[test]
    fn test_open_failure_skips_writes() {
        let opener = MockOpener::unavailable("Access is denied");
        let traffic = opener.traffic();
        let mut sender = quick_sender(opener);

        let result = sender.send("COM11", 115200, "PING", 5);
        assert!(matches!(result, Err(SendError::ChannelUnavailable { .. })));
        assert_eq!(traffic.writes(), 0);
        assert!(sender.delay().pauses.is_empty());
    }

    #[test]
    fn test_match_on_last_attempt() {
        let opener = MockOpener::scripted(vec![
            MockReply::Silence,
            MockReply::Line("PIN".to_string()),
            MockReply::Line("PING".to_string()),
        ]);
        let traffic = opener.traffic();
        let mut sender = quick_sender(opener);

        let delivery = sender.send("COM11", 115200, "PING", 3).unwrap();
        assert_eq!(delivery.attempts, 3);
        assert_eq!(traffic.writes(), 3);
        assert_eq!(traffic.close_calls(), 1);
    }

    #[test]
    fn test_delay_sequence() {
        let opener = MockOpener::scripted(vec![
            MockReply::Line("PONG".to_string()),
            MockReply::Line("PING".to_string()),
        ]);
        let mut sender = quick_sender(opener);

        sender.send("COM11", 115200, "PING", 5).unwrap();
        assert_eq!(
            sender.delay().pauses,
            vec![
                Duration::from_millis(2000),
                Duration::from_millis(500),
                Duration::from_millis(1000),
                Duration::from_millis(500),
            ]
        );
    }

    #[test]
    fn test_no_backoff_after_final_attempt() {
        let opener = MockOpener::scripted(vec![]);
        let mut sender = quick_sender(opener);

        let result = sender.send("COM11", 115200, "PING", 2);
        assert_eq!(result, Err(SendError::RetriesExhausted { attempts: 2 }));
        // settle, wait, backoff, wait
        assert_eq!(sender.delay().pauses.len(), 4);
    }

    #[test]
    fn test_disconnect_mid_loop() {
        let opener = MockOpener::scripted(vec![
            MockReply::Line("garbage".to_string()),
            MockReply::Disconnect,
        ]);
        let traffic = opener.traffic();
        let mut sender = quick_sender(opener);

        let result = sender.send("COM11", 115200, "PING", 5);
        match result {
            Err(SendError::ChannelUnavailable { port, source }) => {
                assert_eq!(port, "COM11");
                assert!(matches!(source, CommError::ConnectionLost { .. }));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(traffic.writes(), 2);
        assert_eq!(traffic.close_calls(), 1);
    }

    #[test]
    fn test_closed_handle_skips_write() {
        let opener = MockOpener::scripted(vec![MockReply::Hangup]);
        let traffic = opener.traffic();
        let mut sender = quick_sender(opener);

        let result = sender.send("COM11", 115200, "PING", 5);
        assert!(matches!(
            result,
            Err(SendError::ChannelUnavailable { source: CommError::ConnectionLost { .. }, .. })
        ));
        // Only the first attempt wrote; the second found the handle closed
        assert_eq!(traffic.writes(), 1);
        assert_eq!(traffic.reads(), 1);
        assert_eq!(traffic.close_calls(), 1);
    }

    #[test]
    fn test_write_failure_is_terminal() {
        let opener = MockOpener::echoing().with_failing_writes();
        let traffic = opener.traffic();
        let mut sender = quick_sender(opener);

        let result = sender.send("COM11", 115200, "PING", 5);
        assert!(matches!(
            result,
            Err(SendError::ChannelUnavailable { source: CommError::Io { .. }, .. })
        ));
        assert_eq!(traffic.reads(), 0);
        assert_eq!(traffic.close_calls(), 1);
    }

    #[test]
    fn test_invalid_requests_do_not_open() {
        let opener = MockOpener::echoing();
        let traffic = opener.traffic();
        let mut sender = quick_sender(opener);

        assert!(matches!(
            sender.send("COM11", 115200, "PING", 0),
            Err(SendError::InvalidRequest { .. })
        ));
        assert!(matches!(
            sender.send("COM11", 0, "PING", 5),
            Err(SendError::InvalidRequest { .. })
        ));
        assert!(matches!(
            sender.send("COM11", 115200, "PI\nNG", 5),
            Err(SendError::InvalidPayload { .. })
        ));
        assert!(matches!(
            sender.send("COM11", 115200, "PING\r", 5),
            Err(SendError::InvalidPayload { .. })
        ));
        assert_eq!(traffic.opens(), 0);
    }

    #[test]
    fn test_send_with_config() {
        let opener = MockOpener::echoing();
        let traffic = opener.traffic();
        let mut sender = quick_sender(opener);

        let config = LinkConfig::new("/dev/ttyUSB0", 9600)
            .with_max_attempts(2)
            .with_timings(LinkTimings::immediate());
        let delivery = sender.send_with(&config, "hello fpga").unwrap();
        assert_eq!(delivery.attempts, 1);
        assert_eq!(traffic.written_lines(), vec!["hello fpga".to_string()]);
        assert!(sender.delay().pauses.iter().all(|d| d.is_zero()));
    }

    #[test]
    fn test_handle_reused_for_every_attempt() {
        let opener = MockOpener::scripted(vec![MockReply::Silence, MockReply::Silence]);
        let traffic = opener.traffic();
        let mut sender = quick_sender(opener);

        let _ = sender.send("COM11", 115200, "PING", 4);
        assert_eq!(traffic.opens(), 1);
        assert_eq!(traffic.writes(), 4);
    }
}
