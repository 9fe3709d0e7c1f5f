//! Health monitor: the periodic probe cycle.
//!
//! One tick runs to completion, including any recovery episode it triggers,
//! before the next begins. The loop holds a steady cadence by sleeping
//! whatever remains of the tick interval after the work is done, and treats
//! an oversized tick-to-tick gap as a wake-from-sleep event.

use crate::config::Config;
use crate::failover::{FailoverState, TickAction};
use crate::latency::LatencyTracker;
use crate::port::{Clock, NetworkPort};
use crate::recovery::{EpisodeOutcome, RecoveryOrchestrator, RecoverySettings};
use crate::stats::RecoveryStats;
use anyhow::Result;
use netsentry_common::{NetworkProfile, ProbeObservation, Tier};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

pub struct Monitor<P: NetworkPort, C: Clock> {
    port: P,
    clock: C,
    profiles: Vec<NetworkProfile>,
    probe_target: String,
    probe_timeout: Duration,
    tick_interval: Duration,
    wake_threshold: Duration,
    wake_grace: Duration,
    reselect_settle: Duration,
    recovery_settings: RecoverySettings,
    state: FailoverState,
    tracker: LatencyTracker,
    stats: RecoveryStats,
}

impl<P: NetworkPort, C: Clock> Monitor<P, C> {
    pub fn new(config: &Config, port: P, clock: C) -> Self {
        Self {
            port,
            clock,
            profiles: config.profiles(),
            probe_target: config.monitor.probe_target.clone(),
            probe_timeout: config.probe_timeout(),
            tick_interval: config.tick_interval(),
            wake_threshold: config.wake_threshold(),
            wake_grace: config.wake_grace(),
            reselect_settle: config.reselect_settle(),
            recovery_settings: RecoverySettings::from_config(config),
            state: FailoverState::new(
                config.monitor.failure_threshold,
                config.reselect_interval(),
            ),
            tracker: LatencyTracker::new(config.monitor.latency_sample_size),
            stats: RecoveryStats::new(),
        }
    }

    pub fn stats(&self) -> &RecoveryStats {
        &self.stats
    }

    pub fn state(&self) -> &FailoverState {
        &self.state
    }

    pub fn tracker(&self) -> &LatencyTracker {
        &self.tracker
    }

    /// Monitor until the shutdown flag flips. The in-flight tick finishes
    /// first; only the cadence sleep is interrupted.
    pub async fn run(&mut self, shutdown: &mut watch::Receiver<bool>) {
        info!("monitoring every {}s", self.tick_interval.as_secs());
        loop {
            if *shutdown.borrow() {
                break;
            }

            self.wake_check().await;

            let work_start = self.clock.now();
            if let Err(e) = self.tick().await {
                warn!("tick abandoned, resuming on next interval: {e:#}");
            }
            let work = self.clock.now().duration_since(work_start);
            let delay = self.tick_interval.saturating_sub(work);

            tokio::select! {
                _ = shutdown.changed() => break,
                _ = self.clock.sleep(delay) => {}
            }
        }
    }

    /// Detect a suspend/resume gap since the previous tick. On a wake event
    /// the monitor pauses for the grace period so the OS can re-establish
    /// its own network state before probing resumes. Returns whether a wake
    /// event was handled.
    pub async fn wake_check(&mut self) -> bool {
        let now = self.clock.now();
        match self.state.tick_gap(now) {
            Some(gap) if gap > self.wake_threshold => {
                warn!(
                    "wake from sleep detected ({:.0}s gap), pausing probes for a {}s grace period",
                    gap.as_secs_f64(),
                    self.wake_grace.as_secs(),
                );
                self.clock.sleep(self.wake_grace).await;
                info!("grace period over, resuming monitoring");
                true
            }
            _ => false,
        }
    }

    /// One monitoring cycle: observe, update the state machine, act on its
    /// decision.
    pub async fn tick(&mut self) -> Result<()> {
        let observed_ssid = self.port.current_network().await;
        let latency = self
            .port
            .probe(&self.probe_target, self.probe_timeout)
            .await;
        let observation = match latency {
            Some(ms) => ProbeObservation::connected(observed_ssid, ms),
            None => ProbeObservation::disconnected(observed_ssid),
        };

        let tier = observation
            .observed_ssid
            .as_deref()
            .and_then(|ssid| self.tier_of(ssid));

        if observation.connected {
            if let (Some(tier), Some(ms)) = (tier, observation.latency_ms) {
                self.tracker.record(tier, ms);
            }
            self.log_status(&observation, tier);
        } else {
            info!(
                "network {} | mode {} | state DOWN",
                observation.ssid_or_unknown(),
                self.state.mode().as_str(),
            );
        }

        let now = self.clock.now();
        match self.state.apply(&observation, tier, now) {
            TickAction::None => {}
            TickAction::TimedReselect => {
                warn!("on the secondary network past the reselect interval, nudging the OS back toward a primary");
                self.port.soft_reselect().await;
                self.clock.sleep(self.reselect_settle).await;
            }
            TickAction::StartRecovery => {
                let orchestrator =
                    RecoveryOrchestrator::new(&self.port, &self.clock, &self.recovery_settings);
                let episode = orchestrator
                    .run_episode(
                        self.state.mode(),
                        observation.observed_ssid.as_deref(),
                        &self.profiles,
                        &mut self.stats,
                    )
                    .await;
                if episode.outcome == EpisodeOutcome::Exhausted {
                    warn!("recovery exhausted every candidate; monitoring continues");
                }
            }
        }

        Ok(())
    }

    fn tier_of(&self, ssid: &str) -> Option<Tier> {
        self.profiles
            .iter()
            .find(|p| p.ssid == ssid)
            .map(|p| p.tier)
    }

    fn log_status(&self, observation: &ProbeObservation, tier: Option<Tier>) {
        let latency = observation.latency_ms.unwrap_or(0.0);
        let average = tier
            .filter(|t| self.tracker.sample_count(*t) > 1)
            .and_then(|t| self.tracker.average(t));
        match average {
            Some(avg) => info!(
                "network {} | mode {} | state OK (latency {:.2}ms / avg {:.2}ms)",
                observation.ssid_or_unknown(),
                self.state.mode().as_str(),
                latency,
                avg,
            ),
            None => info!(
                "network {} | mode {} | state OK (latency {:.2}ms)",
                observation.ssid_or_unknown(),
                self.state.mode().as_str(),
                latency,
            ),
        }
    }
}
