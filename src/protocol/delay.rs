//! Blocking pauses used as flow control by the link protocol

use std::thread;
use std::time::Duration;

/// Source of blocking pauses
pub trait Delay {
    fn pause(&mut self, duration: Duration);
}

/// Sleeps the calling thread
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    fn pause(&mut self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

/// Records requested pauses without sleeping
#[derive(Debug, Default, Clone)]
pub struct RecordingDelay {
    pub pauses: Vec<Duration>,
}

impl RecordingDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> Duration {
        self.pauses.iter().sum()
    }
}

impl Delay for RecordingDelay {
    fn pause(&mut self, duration: Duration) {
        self.pauses.push(duration);
    }
}
