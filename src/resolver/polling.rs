/// Polling resolver — repeats capture → registry → match until the query's
/// match state satisfies a [`WaitMode`] or the deadline passes.
use std::time::Duration;

use crate::config::ResolverConfig;
use crate::errors::CvPomResult;
use crate::perception::registry::ElementRegistry;
use crate::query::matcher::match_elements;
use crate::query::types::Query;
use crate::resolver::loop_control::PollController;
use crate::resolver::state::{Resolution, ResolveState, WaitMode};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollingResolver {
    timeout: Duration,
    interval: Duration,
    backoff_factor: f64,
    max_interval: Duration,
}

impl PollingResolver {
    /// Fixed-interval resolver.
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self {
            timeout,
            interval,
            backoff_factor: 1.0,
            max_interval: interval,
        }
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        Self {
            timeout: config.timeout(),
            interval: config.poll_interval(),
            backoff_factor: config.backoff_factor,
            max_interval: config.max_poll_interval(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_backoff(mut self, factor: f64, max_interval: Duration) -> Self {
        self.backoff_factor = factor;
        self.max_interval = max_interval;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one resolution. `snapshot` must capture a fresh screenshot and
    /// build a new registry on every call.
    ///
    /// Errors from `snapshot` (driver, detector, OCR) abort immediately; only
    /// the absence or presence of matches is retried.
    pub fn resolve<F>(&self, query: &Query, mode: WaitMode, mut snapshot: F) -> CvPomResult<Resolution>
    where
        F: FnMut() -> CvPomResult<ElementRegistry>,
    {
        let mut ctl = PollController::new(
            self.timeout,
            self.interval,
            self.backoff_factor,
            self.max_interval,
        );
        let mut state = ResolveState::Capturing;

        loop {
            tracing::trace!(state = state.name(), poll = ctl.polls(), "resolver step");
            state = match state {
                ResolveState::Capturing => {
                    ctl.record_poll();
                    ResolveState::Matching(snapshot()?)
                }
                ResolveState::Matching(registry) => {
                    let matches: Vec<_> = match_elements(&registry, query).cloned().collect();
                    if mode.is_satisfied(matches.len()) {
                        ResolveState::Resolved(Resolution {
                            registry,
                            matches,
                            elapsed: ctl.elapsed(),
                            polls: ctl.polls(),
                        })
                    } else if ctl.is_expired() {
                        ResolveState::TimedOut
                    } else {
                        ResolveState::Retrying {
                            wait: ctl.next_wait(),
                        }
                    }
                }
                ResolveState::Retrying { wait } => {
                    tracing::debug!(
                        query = %query,
                        mode = ?mode,
                        poll = ctl.polls(),
                        wait_ms = wait.as_millis() as u64,
                        "condition not met yet, retrying"
                    );
                    std::thread::sleep(wait);
                    ResolveState::Capturing
                }
                ResolveState::Resolved(resolution) => {
                    tracing::debug!(
                        query = %query,
                        mode = ?mode,
                        polls = resolution.polls,
                        matches = resolution.matches.len(),
                        elapsed_ms = resolution.elapsed.as_millis() as u64,
                        "query resolved"
                    );
                    return Ok(resolution);
                }
                ResolveState::TimedOut => {
                    let elapsed = ctl.elapsed();
                    tracing::warn!(
                        query = %query,
                        mode = ?mode,
                        polls = ctl.polls(),
                        elapsed_ms = elapsed.as_millis() as u64,
                        "resolution timed out"
                    );
                    return Err(mode.timeout_error(query, elapsed));
                }
            };
        }
    }
}

impl Default for PollingResolver {
    fn default() -> Self {
        Self::from_config(&ResolverConfig::default())
    }
}
