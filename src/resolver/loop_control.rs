// Deadline and poll-interval bookkeeping for one resolution.
use std::time::{Duration, Instant};

pub struct PollController {
    start_time: Instant,
    timeout: Duration,
    interval: Duration,
    backoff_factor: f64,
    max_interval: Duration,
    polls: u32,
}

impl PollController {
    pub fn new(
        timeout: Duration,
        interval: Duration,
        backoff_factor: f64,
        max_interval: Duration,
    ) -> Self {
        Self {
            start_time: Instant::now(),
            timeout,
            interval,
            backoff_factor: backoff_factor.max(1.0),
            max_interval: max_interval.max(interval),
            polls: 0,
        }
    }

    pub fn record_poll(&mut self) {
        self.polls += 1;
    }

    pub fn polls(&self) -> u32 {
        self.polls
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn is_expired(&self) -> bool {
        self.elapsed() >= self.timeout
    }

    pub fn remaining(&self) -> Duration {
        self.timeout.saturating_sub(self.elapsed())
    }

    /// Sleep before the next poll, never past the deadline. Grows the
    /// interval by the backoff factor for the poll after.
    pub fn next_wait(&mut self) -> Duration {
        let wait = self.interval.min(self.remaining());
        let grown = Duration::from_nanos(
            (self.interval.as_nanos() as f64 * self.backoff_factor).round() as u64,
        );
        self.interval = grown.min(self.max_interval);
        wait
    }
}
