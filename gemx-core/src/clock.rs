use std::thread;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Local, TimeDelta};

/// Time source and suspension primitive used by the loader and renderer.
pub trait Clock {
    fn now(&self) -> DateTime<FixedOffset>;

    fn sleep(&mut self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }

    fn sleep(&mut self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

/// Deterministic clock: `sleep` returns immediately and advances `now`.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: DateTime<FixedOffset>,
    sleeps: Vec<Duration>,
}

impl ManualClock {
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        Self {
            now,
            sleeps: Vec::new(),
        }
    }

    pub fn sleeps(&self) -> &[Duration] {
        &self.sleeps
    }

    pub fn total_slept(&self) -> Duration {
        self.sleeps.iter().sum()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.now
    }

    fn sleep(&mut self, duration: Duration) {
        self.sleeps.push(duration);
        if let Ok(delta) = TimeDelta::from_std(duration) {
            self.now += delta;
        }
    }
}
