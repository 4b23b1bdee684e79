use std::time::Duration;

use crate::errors::CvPomError;
use crate::perception::registry::ElementRegistry;
use crate::perception::types::Element;
use crate::query::types::Query;

/// What a resolution waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitMode {
    /// At least one element matches.
    Present,
    /// No element matches.
    Absent,
}

impl WaitMode {
    pub fn is_satisfied(&self, match_count: usize) -> bool {
        match self {
            WaitMode::Present => match_count > 0,
            WaitMode::Absent => match_count == 0,
        }
    }

    pub fn timeout_error(&self, query: &Query, elapsed: Duration) -> CvPomError {
        let query = query.to_string();
        let elapsed_ms = elapsed.as_millis() as u64;
        match self {
            WaitMode::Present => CvPomError::ElementNotFound { query, elapsed_ms },
            WaitMode::Absent => CvPomError::ElementStillPresent { query, elapsed_ms },
        }
    }
}

/// Lifecycle of a single resolution request.
#[derive(Debug)]
pub enum ResolveState {
    Capturing,
    Matching(ElementRegistry),
    Retrying { wait: Duration },
    Resolved(Resolution),
    TimedOut,
}

impl ResolveState {
    pub fn name(&self) -> &'static str {
        match self {
            ResolveState::Capturing => "capturing",
            ResolveState::Matching(_) => "matching",
            ResolveState::Retrying { .. } => "retrying",
            ResolveState::Resolved(_) => "resolved",
            ResolveState::TimedOut => "timed_out",
        }
    }
}

/// Successful outcome of a resolution.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Registry of the poll that satisfied the condition.
    pub registry: ElementRegistry,
    /// Matching elements in registry order; empty for [`WaitMode::Absent`].
    pub matches: Vec<Element>,
    pub elapsed: Duration,
    pub polls: u32,
}

impl Resolution {
    pub fn first(&self) -> Option<&Element> {
        self.matches.first()
    }

    pub fn into_first(self) -> Option<Element> {
        self.matches.into_iter().next()
    }
}
