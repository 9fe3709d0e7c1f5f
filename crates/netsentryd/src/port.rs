//! Platform port abstraction.
//!
//! The monitoring core never talks to the OS directly; it goes through the
//! `NetworkPort` trait so that:
//! - production code uses a platform adapter that shells out to the real
//!   wireless stack,
//! - tests use `FakeNetworkPort` with scripted responses and no system calls.
//!
//! The `Clock` trait plays the same role for time: the core sleeps and reads
//! the clock through it, so tests run on virtual time.

use async_trait::async_trait;
use netsentry_common::{NetworkProfile, PortError};
use std::collections::HashSet;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

// ============================================================================
// Network Port Trait
// ============================================================================

/// Capability interface over the OS wireless stack.
///
/// Every method is bounded-time at the adapter level. Failures surface as
/// `None` / `false` / logged errors; nothing here panics or blocks forever.
#[async_trait]
pub trait NetworkPort: Send + Sync {
    /// SSID the interface is currently associated with, best effort.
    async fn current_network(&self) -> Option<String>;

    /// One connectivity probe against `host`. `Some(latency_ms)` on success,
    /// `None` on timeout, error, or unparsable output.
    async fn probe(&self, host: &str, timeout: Duration) -> Option<f64>;

    /// Rank the known networks at the OS level. Called once at startup;
    /// best effort, the caller logs failures and carries on.
    async fn set_preferred_networks(&self, profiles: &[NetworkProfile]) -> Result<(), PortError>;

    /// Ask the OS network stack to re-evaluate its own connection choice.
    /// No guaranteed outcome; the caller verifies afterwards.
    async fn soft_reselect(&self);

    /// Direct association request with explicit credentials. The returned
    /// bool means the command was accepted, not that connectivity exists.
    async fn force_connect(&self, ssid: &str, password: &str, timeout: Duration) -> bool;
}

// ============================================================================
// Clock Trait
// ============================================================================

/// Injectable time source so the tick cadence, settle delays, and wake
/// detection can be tested without real waiting.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock implementation used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

// ============================================================================
// Fake Clock (Testing)
// ============================================================================

/// Virtual-time clock for deterministic tests.
///
/// `sleep` advances virtual time instantly and records the requested
/// duration. Clones share state, so tests keep a handle after handing the
/// clock to the monitor.
#[derive(Clone)]
pub struct FakeClock {
    inner: Arc<FakeClockState>,
}

struct FakeClockState {
    origin: Instant,
    offset: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(FakeClockState {
                origin: Instant::now(),
                offset: Mutex::new(Duration::ZERO),
                sleeps: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Move virtual time forward without recording a sleep, e.g. to
    /// simulate the host being suspended between ticks.
    pub fn advance(&self, duration: Duration) {
        *self.inner.offset.lock().unwrap() += duration;
    }

    /// Every duration passed to `sleep`, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.inner.sleeps.lock().unwrap().clone()
    }

    pub fn clear_sleeps(&self) {
        self.inner.sleeps.lock().unwrap().clear();
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.inner.origin + *self.inner.offset.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        self.advance(duration);
        self.inner.sleeps.lock().unwrap().push(duration);
    }
}

// ============================================================================
// Fake Network Port (Testing)
// ============================================================================

/// Scripted port for deterministic tests, no system calls.
///
/// Probe results are consumed from a FIFO script, falling back to a default
/// once the script is empty. Reselect/connect behavior is configurable per
/// scenario, and every call is counted for assertions. Clones share state.
#[derive(Clone)]
pub struct FakeNetworkPort {
    inner: Arc<FakePortState>,
}

struct FakePortState {
    current_ssid: Mutex<Option<String>>,
    probe_script: Mutex<VecDeque<Option<f64>>>,
    default_probe: Mutex<Option<f64>>,
    /// SSID the interface lands on after a soft reselect, if any.
    reselect_target: Mutex<Option<String>>,
    /// SSIDs for which force_connect reports rejection.
    denied_connects: Mutex<HashSet<String>>,
    /// Whether an accepted force_connect actually associates.
    connect_associates: Mutex<bool>,
    preferred: Mutex<Option<Vec<NetworkProfile>>>,
    probe_calls: Mutex<usize>,
    soft_reselect_calls: Mutex<usize>,
    force_connect_calls: Mutex<Vec<String>>,
}

impl FakeNetworkPort {
    /// A port that reports no association and failing probes.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(FakePortState {
                current_ssid: Mutex::new(None),
                probe_script: Mutex::new(VecDeque::new()),
                default_probe: Mutex::new(None),
                reselect_target: Mutex::new(None),
                denied_connects: Mutex::new(HashSet::new()),
                connect_associates: Mutex::new(true),
                preferred: Mutex::new(None),
                probe_calls: Mutex::new(0),
                soft_reselect_calls: Mutex::new(0),
                force_connect_calls: Mutex::new(Vec::new()),
            }),
        }
    }

    /// A port associated to `ssid` with every probe succeeding at
    /// `latency_ms`.
    pub fn connected(ssid: &str, latency_ms: f64) -> Self {
        let port = Self::new();
        port.set_current_network(Some(ssid));
        port.set_default_probe(Some(latency_ms));
        port
    }

    pub fn set_current_network(&self, ssid: Option<&str>) {
        *self.inner.current_ssid.lock().unwrap() = ssid.map(str::to_string);
    }

    /// Queue one scripted probe result; consumed in FIFO order before the
    /// default applies.
    pub fn queue_probe(&self, result: Option<f64>) {
        self.inner.probe_script.lock().unwrap().push_back(result);
    }

    pub fn queue_probes(&self, results: &[Option<f64>]) {
        for r in results {
            self.queue_probe(*r);
        }
    }

    pub fn set_default_probe(&self, result: Option<f64>) {
        *self.inner.default_probe.lock().unwrap() = result;
    }

    /// After the next soft reselect the interface reports `ssid`.
    pub fn on_soft_reselect_associate(&self, ssid: Option<&str>) {
        *self.inner.reselect_target.lock().unwrap() = ssid.map(str::to_string);
    }

    /// Make force_connect report rejection for `ssid`.
    pub fn deny_force_connect(&self, ssid: &str) {
        self.inner
            .denied_connects
            .lock()
            .unwrap()
            .insert(ssid.to_string());
    }

    /// When false, an accepted force_connect leaves the association
    /// unchanged, so verification fails on the SSID check.
    pub fn set_connect_associates(&self, associates: bool) {
        *self.inner.connect_associates.lock().unwrap() = associates;
    }

    pub fn probe_calls(&self) -> usize {
        *self.inner.probe_calls.lock().unwrap()
    }

    pub fn soft_reselect_calls(&self) -> usize {
        *self.inner.soft_reselect_calls.lock().unwrap()
    }

    /// Target SSIDs of every force_connect call, in order.
    pub fn force_connect_calls(&self) -> Vec<String> {
        self.inner.force_connect_calls.lock().unwrap().clone()
    }

    /// Profiles passed to the last set_preferred_networks call.
    pub fn preferred_networks(&self) -> Option<Vec<NetworkProfile>> {
        self.inner.preferred.lock().unwrap().clone()
    }
}

impl Default for FakeNetworkPort {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NetworkPort for FakeNetworkPort {
    async fn current_network(&self) -> Option<String> {
        self.inner.current_ssid.lock().unwrap().clone()
    }

    async fn probe(&self, _host: &str, _timeout: Duration) -> Option<f64> {
        *self.inner.probe_calls.lock().unwrap() += 1;
        let scripted = self.inner.probe_script.lock().unwrap().pop_front();
        match scripted {
            Some(result) => result,
            None => *self.inner.default_probe.lock().unwrap(),
        }
    }

    async fn set_preferred_networks(&self, profiles: &[NetworkProfile]) -> Result<(), PortError> {
        *self.inner.preferred.lock().unwrap() = Some(profiles.to_vec());
        Ok(())
    }

    async fn soft_reselect(&self) {
        *self.inner.soft_reselect_calls.lock().unwrap() += 1;
        let target = self.inner.reselect_target.lock().unwrap().clone();
        if let Some(ssid) = target {
            self.set_current_network(Some(&ssid));
        }
    }

    async fn force_connect(&self, ssid: &str, _password: &str, _timeout: Duration) -> bool {
        self.inner
            .force_connect_calls
            .lock()
            .unwrap()
            .push(ssid.to_string());
        if self.inner.denied_connects.lock().unwrap().contains(ssid) {
            return false;
        }
        if *self.inner.connect_associates.lock().unwrap() {
            self.set_current_network(Some(ssid));
        }
        true
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_port_probe_script_then_default() {
        let port = FakeNetworkPort::new();
        port.set_default_probe(Some(20.0));
        port.queue_probes(&[Some(5.0), None]);

        assert_eq!(port.probe("8.8.8.8", Duration::from_secs(1)).await, Some(5.0));
        assert_eq!(port.probe("8.8.8.8", Duration::from_secs(1)).await, None);
        // Script exhausted, default applies
        assert_eq!(port.probe("8.8.8.8", Duration::from_secs(1)).await, Some(20.0));
        assert_eq!(port.probe_calls(), 3);
    }

    #[tokio::test]
    async fn test_fake_port_reselect_association() {
        let port = FakeNetworkPort::new();
        assert_eq!(port.current_network().await, None);

        port.on_soft_reselect_associate(Some("Home"));
        port.soft_reselect().await;
        assert_eq!(port.current_network().await.as_deref(), Some("Home"));
        assert_eq!(port.soft_reselect_calls(), 1);
    }

    #[tokio::test]
    async fn test_fake_port_force_connect() {
        let port = FakeNetworkPort::new();
        port.deny_force_connect("Bad");

        assert!(!port.force_connect("Bad", "pw", Duration::from_secs(1)).await);
        assert!(port.force_connect("Good", "pw", Duration::from_secs(1)).await);
        assert_eq!(port.current_network().await.as_deref(), Some("Good"));
        assert_eq!(port.force_connect_calls(), vec!["Bad", "Good"]);
    }

    #[tokio::test]
    async fn test_fake_port_accepted_connect_without_association() {
        let port = FakeNetworkPort::new();
        port.set_connect_associates(false);

        assert!(port.force_connect("Home", "pw", Duration::from_secs(1)).await);
        assert_eq!(port.current_network().await, None);
    }

    #[tokio::test]
    async fn test_fake_clock_virtual_time() {
        let clock = FakeClock::new();
        let start = clock.now();

        clock.sleep(Duration::from_secs(5)).await;
        clock.advance(Duration::from_secs(90));

        assert_eq!(clock.now().duration_since(start), Duration::from_secs(95));
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(5)]);
    }
}
