//! Recovery statistics.
//!
//! Four monotonic counters for the life of the monitoring session: attempts
//! and verified successes per escalation method. Reported after each
//! successful episode and in the shutdown summary.

use serde::Serialize;

/// Escalation method of a recovery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptMethod {
    Gentle,
    Forceful,
}

impl AttemptMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gentle => "gentle",
            Self::Forceful => "forceful",
        }
    }
}

/// Monotonic attempt/success counters by escalation method.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RecoveryStats {
    pub gentle_attempts: u64,
    pub gentle_successes: u64,
    pub forceful_attempts: u64,
    pub forceful_successes: u64,
}

impl RecoveryStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one attempt, regardless of its outcome.
    pub fn record_attempt(&mut self, method: AttemptMethod) {
        match method {
            AttemptMethod::Gentle => self.gentle_attempts += 1,
            AttemptMethod::Forceful => self.forceful_attempts += 1,
        }
    }

    /// Count one verified success.
    pub fn record_success(&mut self, method: AttemptMethod) {
        match method {
            AttemptMethod::Gentle => self.gentle_successes += 1,
            AttemptMethod::Forceful => self.forceful_successes += 1,
        }
    }

    pub fn total_attempts(&self) -> u64 {
        self.gentle_attempts + self.forceful_attempts
    }

    pub fn total_successes(&self) -> u64 {
        self.gentle_successes + self.forceful_successes
    }

    /// One-line cumulative report, logged after each successful episode.
    pub fn cumulative_line(&self) -> String {
        format!(
            "recoveries so far: {} (gentle {}/{}, forceful {}/{})",
            self.total_successes(),
            self.gentle_successes,
            self.gentle_attempts,
            self.forceful_successes,
            self.forceful_attempts,
        )
    }

    /// Multi-line shutdown summary, printed to stdout on exit.
    pub fn summary(&self) -> String {
        format!(
            "session summary: {} interventions attempted, {} succeeded\n\
             -> gentle attempts: {}, successes: {}\n\
             -> forceful attempts: {}, successes: {}",
            self.total_attempts(),
            self.total_successes(),
            self.gentle_attempts,
            self.gentle_successes,
            self.forceful_attempts,
            self.forceful_successes,
        )
    }
}
