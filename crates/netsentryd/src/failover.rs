//! Failover state machine.
//!
//! Owns the operating mode, the consecutive-failure counter, and the
//! reselect/tick timestamps. All mutation happens through `apply` and
//! `tick_gap`; the rest of the daemon only reads snapshots or acts on the
//! returned `TickAction`.

use netsentry_common::{ProbeObservation, Tier};
use std::time::{Duration, Instant};
use tracing::warn;

/// Which tier the watchdog believes the host is operating on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Primary,
    Secondary,
    Unknown,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "PRIMARY",
            Self::Secondary => "SECONDARY",
            Self::Unknown => "UNKNOWN",
        }
    }

    fn of_tier(tier: Tier) -> Self {
        match tier {
            Tier::Primary => Self::Primary,
            Tier::Secondary => Self::Secondary,
        }
    }
}

/// What the state machine wants done after absorbing one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickAction {
    /// Nothing beyond routine monitoring.
    None,
    /// On the secondary network beyond the reselect interval; give the OS
    /// one low-cost nudge back toward the primary tier.
    TimedReselect,
    /// Failure threshold crossed; run a recovery episode.
    StartRecovery,
}

/// Mutable failover state, single instance per monitoring session.
#[derive(Debug)]
pub struct FailoverState {
    mode: Mode,
    consecutive_failures: u32,
    last_reselect: Option<Instant>,
    last_tick: Option<Instant>,
    failure_threshold: u32,
    reselect_interval: Duration,
}

impl FailoverState {
    pub fn new(failure_threshold: u32, reselect_interval: Duration) -> Self {
        Self {
            mode: Mode::Unknown,
            consecutive_failures: 0,
            last_reselect: None,
            last_tick: None,
            failure_threshold,
            reselect_interval,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Record a tick start and return the gap since the previous one.
    /// The monitor uses the gap for wake detection.
    pub fn tick_gap(&mut self, now: Instant) -> Option<Duration> {
        let gap = self.last_tick.map(|t| now.duration_since(t));
        self.last_tick = Some(now);
        gap
    }

    /// Absorb one observation and decide what, if anything, must happen.
    pub fn apply(
        &mut self,
        observation: &ProbeObservation,
        observed_tier: Option<Tier>,
        now: Instant,
    ) -> TickAction {
        if observation.connected {
            self.on_connected(observation, observed_tier, now)
        } else {
            self.on_disconnected()
        }
    }

    fn on_connected(
        &mut self,
        observation: &ProbeObservation,
        observed_tier: Option<Tier>,
        now: Instant,
    ) -> TickAction {
        self.consecutive_failures = 0;

        // Self-heal: trust what the interface reports over what we believe.
        if let Some(tier) = observed_tier {
            let observed_mode = Mode::of_tier(tier);
            if observed_mode != self.mode {
                warn!(
                    "connected to {} network '{}', correcting mode {} -> {}",
                    tier.as_str(),
                    observation.ssid_or_unknown(),
                    self.mode.as_str(),
                    observed_mode.as_str(),
                );
                self.mode = observed_mode;
                if self.mode == Mode::Secondary {
                    self.last_reselect = Some(now);
                }
            }
        }

        if self.mode == Mode::Secondary {
            let due = self
                .last_reselect
                .map_or(true, |t| now.duration_since(t) > self.reselect_interval);
            if due {
                self.last_reselect = Some(now);
                return TickAction::TimedReselect;
            }
        }

        TickAction::None
    }

    fn on_disconnected(&mut self) -> TickAction {
        self.consecutive_failures += 1;
        if self.consecutive_failures >= self.failure_threshold {
            warn!(
                "connectivity lost: {} consecutive failed probes, threshold reached",
                self.consecutive_failures
            );
            self.consecutive_failures = 0;
            return TickAction::StartRecovery;
        }
        TickAction::None
    }
}
