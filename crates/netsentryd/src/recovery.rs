//! Recovery orchestration: the gentle-then-forceful escalation protocol.
//!
//! Invoked by the monitor when the failure threshold is crossed. Builds an
//! ordered candidate list from the known networks, then walks it: for each
//! candidate, a gentle reselect first (let the OS's own logic succeed when it
//! can), and only if that fails verification, a forceful direct connection
//! with explicit credentials. The first verified attempt ends the episode.
//!
//! Exhausting every candidate is reported but never fatal; monitoring resumes
//! and the failure counter accumulates again from zero.

use crate::config::Config;
use crate::failover::Mode;
use crate::port::{Clock, NetworkPort};
use crate::stats::{AttemptMethod, RecoveryStats};
use netsentry_common::{NetworkProfile, Tier};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Outcome of one recovery episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeOutcome {
    Success,
    Exhausted,
}

/// One escalation step against a single candidate.
#[derive(Debug, Clone)]
pub struct RecoveryAttempt {
    pub target: NetworkProfile,
    pub method: AttemptMethod,
    pub verified: bool,
}

/// One complete recovery sequence, discarded once its outcome is recorded.
#[derive(Debug, Clone)]
pub struct RecoveryEpisode {
    pub trigger_time: Instant,
    pub candidates: Vec<NetworkProfile>,
    pub attempts: Vec<RecoveryAttempt>,
    pub outcome: EpisodeOutcome,
}

/// Timeouts and settle delays the orchestrator works with.
#[derive(Debug, Clone)]
pub struct RecoverySettings {
    pub probe_target: String,
    pub probe_timeout: Duration,
    pub switch_timeout: Duration,
    pub gentle_settle: Duration,
    pub forceful_settle: Duration,
}

impl RecoverySettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            probe_target: config.monitor.probe_target.clone(),
            probe_timeout: config.probe_timeout(),
            switch_timeout: config.switch_timeout(),
            gentle_settle: config.gentle_settle(),
            forceful_settle: config.forceful_settle(),
        }
    }
}

/// Ordered candidate list for an episode.
///
/// From the primary tier: every other primary in rank order, then the
/// secondary as last resort. From the secondary tier (or an unknown mode):
/// every primary in rank order.
pub fn candidate_list(
    mode: Mode,
    failing_ssid: Option<&str>,
    profiles: &[NetworkProfile],
) -> Vec<NetworkProfile> {
    let mut primaries: Vec<&NetworkProfile> =
        profiles.iter().filter(|p| p.tier == Tier::Primary).collect();
    primaries.sort_by_key(|p| p.rank);

    match mode {
        Mode::Primary => {
            let mut list: Vec<NetworkProfile> = primaries
                .into_iter()
                .filter(|p| Some(p.ssid.as_str()) != failing_ssid)
                .cloned()
                .collect();
            list.extend(
                profiles
                    .iter()
                    .find(|p| p.tier == Tier::Secondary)
                    .cloned(),
            );
            list
        }
        Mode::Secondary | Mode::Unknown => primaries.into_iter().cloned().collect(),
    }
}

/// Executes recovery episodes against the platform port.
pub struct RecoveryOrchestrator<'a, P: NetworkPort, C: Clock> {
    port: &'a P,
    clock: &'a C,
    settings: &'a RecoverySettings,
}

impl<'a, P: NetworkPort, C: Clock> RecoveryOrchestrator<'a, P, C> {
    pub fn new(port: &'a P, clock: &'a C, settings: &'a RecoverySettings) -> Self {
        Self {
            port,
            clock,
            settings,
        }
    }

    /// Run one episode to completion. Never fails; the worst case is an
    /// `Exhausted` outcome.
    pub async fn run_episode(
        &self,
        mode: Mode,
        failing_ssid: Option<&str>,
        profiles: &[NetworkProfile],
        stats: &mut RecoveryStats,
    ) -> RecoveryEpisode {
        let trigger_time = self.clock.now();
        let candidates = candidate_list(mode, failing_ssid, profiles);
        let mut attempts = Vec::new();

        for candidate in &candidates {
            warn!("attempting recovery to '{}'", candidate.ssid);

            let method = if self.gentle_attempt(candidate, stats, &mut attempts).await {
                AttemptMethod::Gentle
            } else if self.forceful_attempt(candidate, stats, &mut attempts).await {
                AttemptMethod::Forceful
            } else {
                warn!(
                    "recovery to '{}' failed, moving to the next candidate",
                    candidate.ssid
                );
                continue;
            };

            let elapsed = self.clock.now().duration_since(trigger_time);
            warn!(
                "recovered to '{}' via {} in {:.1}s; {}",
                candidate.ssid,
                method.as_str(),
                elapsed.as_secs_f64(),
                stats.cumulative_line(),
            );
            return RecoveryEpisode {
                trigger_time,
                candidates: candidates.clone(),
                attempts,
                outcome: EpisodeOutcome::Success,
            };
        }

        warn!("tried every candidate without restoring connectivity");
        RecoveryEpisode {
            trigger_time,
            candidates,
            attempts,
            outcome: EpisodeOutcome::Exhausted,
        }
    }

    async fn gentle_attempt(
        &self,
        candidate: &NetworkProfile,
        stats: &mut RecoveryStats,
        attempts: &mut Vec<RecoveryAttempt>,
    ) -> bool {
        info!(
            "step 1 (gentle): asking the OS to reselect toward '{}'",
            candidate.ssid
        );
        stats.record_attempt(AttemptMethod::Gentle);
        self.port.soft_reselect().await;
        self.clock.sleep(self.settings.gentle_settle).await;

        let verified = self.verify(candidate).await;
        attempts.push(RecoveryAttempt {
            target: candidate.clone(),
            method: AttemptMethod::Gentle,
            verified,
        });
        if verified {
            stats.record_success(AttemptMethod::Gentle);
            info!("gentle reselect landed on '{}'", candidate.ssid);
        }
        verified
    }

    async fn forceful_attempt(
        &self,
        candidate: &NetworkProfile,
        stats: &mut RecoveryStats,
        attempts: &mut Vec<RecoveryAttempt>,
    ) -> bool {
        info!(
            "step 2 (forceful): direct connection to '{}'",
            candidate.ssid
        );
        stats.record_attempt(AttemptMethod::Forceful);
        let accepted = self
            .port
            .force_connect(
                &candidate.ssid,
                &candidate.password,
                self.settings.switch_timeout,
            )
            .await;

        let verified = if accepted {
            self.clock.sleep(self.settings.forceful_settle).await;
            self.verify(candidate).await
        } else {
            false
        };
        attempts.push(RecoveryAttempt {
            target: candidate.clone(),
            method: AttemptMethod::Forceful,
            verified,
        });
        if verified {
            stats.record_success(AttemptMethod::Forceful);
            info!("forceful connection to '{}' verified", candidate.ssid);
        }
        verified
    }

    /// An attempt counts only if the interface reports the candidate's SSID
    /// and a fresh probe gets through on it.
    async fn verify(&self, candidate: &NetworkProfile) -> bool {
        match self.port.current_network().await.as_deref() {
            Some(ssid) if ssid == candidate.ssid => {}
            _ => return false,
        }
        self.port
            .probe(&self.settings.probe_target, self.settings.probe_timeout)
            .await
            .is_some()
    }
}
