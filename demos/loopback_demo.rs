//! Reliable send demonstration over a simulated link
//!
//! Shows the confirm-or-retry loop against a remote that echoes, one that
//! answers with the wrong text, and one that disappears mid-send.

use serial_ack::hardware::{ByteTransport, MockFallback, MockOpener, MockReply, MockTransport};
use serial_ack::protocol::RecordingDelay;
use serial_ack::{EchoReceiver, LinkTimings, ReliableSender, SendError};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Serial Acknowledgment Link - Loopback Demo ===\n");

    demo_echoing_remote()?;
    demo_flaky_remote();
    demo_lost_remote();
    demo_receiver()?;

    println!("Loopback demo completed successfully!");
    Ok(())
}

fn demo_echoing_remote() -> Result<(), Box<dyn std::error::Error>> {
    println!("--- Echoing Remote ---");

    let opener = MockOpener::echoing();
    let traffic = opener.traffic();
    let mut sender = ReliableSender::new(opener).with_timings(LinkTimings::immediate());

    let delivery = sender.send("COM11", 115200, "PING", 5)?;
    println!("{} ({} attempt)", delivery, delivery.attempts);
    println!("Lines written: {:?}\n", traffic.written_lines());
    Ok(())
}

fn demo_flaky_remote() {
    println!("--- Flaky Remote ---");

    let opener = MockOpener::scripted(vec![
        MockReply::Silence,
        MockReply::Line("PIGN".to_string()),
        MockReply::Line("PING".to_string()),
    ]);
    let mut sender = ReliableSender::with_delay(opener, RecordingDelay::new());

    match sender.send("COM11", 115200, "PING", 5) {
        Ok(delivery) => println!("Delivered after {} attempts", delivery.attempts),
        Err(e) => println!("Unexpected failure: {}", e),
    }
    println!(
        "Would have slept {:?} in total on real hardware\n",
        sender.delay().total()
    );
}

fn demo_lost_remote() {
    println!("--- Lost Remote ---");

    let opener = MockOpener::scripted(vec![MockReply::Disconnect]);
    let traffic = opener.traffic();
    let mut sender = ReliableSender::new(opener).with_timings(LinkTimings::immediate());

    match sender.send("COM11", 115200, "PING", 5) {
        Err(SendError::ChannelUnavailable { port, source }) => {
            println!("Channel unavailable on {}: {}", port, source);
            println!("Recovery strategy: {:?}", source.recovery_strategy());
        }
        other => println!("Expected channel failure, got {:?}", other),
    }
    println!("Writes: {}, close calls: {}\n", traffic.writes(), traffic.close_calls());
}

fn demo_receiver() -> Result<(), Box<dyn std::error::Error>> {
    println!("--- Echo Receiver ---");

    let mut transport = MockTransport::new("COM12");
    transport.set_fallback(MockFallback::Silence);
    transport.push_line("hello");
    transport.push_line("0xABCDEF");
    let traffic = transport.traffic();

    let mut receiver = EchoReceiver::echo(transport);
    let stats = receiver.run_until(|stats| stats.received == 2)?;
    println!("Received {}, echoed {}", stats.received, stats.echoed);
    println!("Echoed lines: {:?}", traffic.written_lines());
    println!("Port open after run: {}\n", receiver.transport().is_open());
    Ok(())
}
