use proptest::prelude::*;
use serial_ack::hardware::{MockOpener, MockReply};
use serial_ack::protocol::RecordingDelay;
use serial_ack::{ReliableSender, SendError};

fn mismatch_for(payload: &str) -> MockReply {
    MockReply::Line(format!("~{}", payload))
}

fn payloads() -> impl Strategy<Value = String> {
    "[ -~]{0,32}"
}

proptest! {
    #[test]
    fn match_stops_loop(payload in payloads(), max_attempts in 1u32..8, pick in 0u32..8) {
        let k = pick % max_attempts + 1;
        let mut script: Vec<MockReply> = (1..k).map(|_| mismatch_for(&payload)).collect();
        script.push(MockReply::Line(payload.clone()));

        let opener = MockOpener::scripted(script);
        let traffic = opener.traffic();
        let mut sender = ReliableSender::with_delay(opener, RecordingDelay::new());

        let delivery = sender.send("COM11", 115200, &payload, max_attempts).unwrap();
        prop_assert_eq!(delivery.attempts, k);
        prop_assert_eq!(traffic.writes(), k as usize);
        prop_assert_eq!(traffic.reads(), k);
        prop_assert_eq!(traffic.close_calls(), 1);
        prop_assert_eq!(traffic.closes(), 1);
    }

    #[test]
    fn exhaustion(payload in payloads(), max_attempts in 1u32..8) {
        let script: Vec<MockReply> = (0..max_attempts).map(|_| mismatch_for(&payload)).collect();

        let opener = MockOpener::scripted(script);
        let traffic = opener.traffic();
        let mut sender = ReliableSender::with_delay(opener, RecordingDelay::new());

        let result = sender.send("COM11", 115200, &payload, max_attempts);
        prop_assert_eq!(result, Err(SendError::RetriesExhausted { attempts: max_attempts }));
        prop_assert_eq!(traffic.writes(), max_attempts as usize);
        prop_assert_eq!(traffic.reads(), max_attempts);
        prop_assert_eq!(traffic.close_calls(), 1);
    }

    #[test]
    fn dead_channel_short_circuits(payload in payloads(), max_attempts in 1u32..8, pick in 0u32..8) {
        let dies_on = pick % max_attempts + 1;
        let mut script: Vec<MockReply> = (1..dies_on).map(|_| mismatch_for(&payload)).collect();
        script.push(MockReply::Disconnect);

        let opener = MockOpener::scripted(script);
        let traffic = opener.traffic();
        let mut sender = ReliableSender::with_delay(opener, RecordingDelay::new());

        let result = sender.send("COM11", 115200, &payload, max_attempts);
        let unavailable = matches!(result, Err(SendError::ChannelUnavailable { .. }));
        prop_assert!(unavailable);
        prop_assert_eq!(traffic.writes(), dies_on as usize);
        prop_assert_eq!(traffic.close_calls(), 1);
    }
}
