//! Monitor-level behavior: wake detection, timed reselection, and latency
//! bookkeeping, all on virtual time.

use netsentry_common::Tier;
use netsentryd::config::Config;
use netsentryd::failover::Mode;
use netsentryd::monitor::Monitor;
use netsentryd::port::{FakeClock, FakeNetworkPort};
use std::time::Duration;

fn test_config() -> Config {
    let mut config = Config::default();
    config.networks.primary_ssids = vec!["A".into(), "B".into()];
    config.networks.secondary_ssid = "D".into();
    config.monitor.wake_threshold_secs = 60;
    config.monitor.wake_grace_secs = 15;
    config.monitor.reselect_interval_secs = 300;
    config.validate().expect("test config must be valid");
    config
}

#[tokio::test]
async fn test_wake_gap_triggers_one_grace_sleep() {
    let config = test_config();
    let port = FakeNetworkPort::connected("A", 10.0);
    let clock = FakeClock::new();
    let mut monitor = Monitor::new(&config, port, clock.clone());

    // First tick has no previous tick to compare against
    assert!(!monitor.wake_check().await);
    monitor.tick().await.unwrap();

    // The host was suspended for 90s: over the 60s threshold
    clock.advance(Duration::from_secs(90));
    clock.clear_sleeps();
    assert!(monitor.wake_check().await);
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(15)]);

    // Probing resumes in the same cycle and the next normal gap is quiet
    monitor.tick().await.unwrap();
    clock.advance(Duration::from_secs(3));
    assert!(!monitor.wake_check().await);
}

#[tokio::test]
async fn test_gap_below_threshold_never_pauses() {
    let config = test_config();
    let port = FakeNetworkPort::connected("A", 10.0);
    let clock = FakeClock::new();
    let mut monitor = Monitor::new(&config, port, clock.clone());

    monitor.wake_check().await;
    monitor.tick().await.unwrap();

    clock.advance(Duration::from_secs(59));
    clock.clear_sleeps();
    assert!(!monitor.wake_check().await);
    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn test_timed_reselect_while_on_secondary() {
    let config = test_config();
    let port = FakeNetworkPort::connected("D", 40.0);
    let clock = FakeClock::new();
    let mut monitor = Monitor::new(&config, port.clone(), clock.clone());

    // First healthy tick on the hotspot: enters SECONDARY, arms the timer
    monitor.tick().await.unwrap();
    assert_eq!(monitor.state().mode(), Mode::Secondary);
    assert_eq!(port.soft_reselect_calls(), 0);

    // 100s later: still within the reselect interval
    clock.advance(Duration::from_secs(100));
    monitor.tick().await.unwrap();
    assert_eq!(port.soft_reselect_calls(), 0);

    // 350s after entry: one nudge back toward the primary tier
    clock.advance(Duration::from_secs(250));
    monitor.tick().await.unwrap();
    assert_eq!(port.soft_reselect_calls(), 1);

    // Immediately after, the timer is re-armed
    monitor.tick().await.unwrap();
    assert_eq!(port.soft_reselect_calls(), 1);
}

#[tokio::test]
async fn test_latency_recorded_under_observed_tier_only() {
    let config = test_config();
    let port = FakeNetworkPort::connected("A", 12.0);
    let clock = FakeClock::new();
    let mut monitor = Monitor::new(&config, port.clone(), clock.clone());

    monitor.tick().await.unwrap();
    monitor.tick().await.unwrap();
    assert_eq!(monitor.tracker().sample_count(Tier::Primary), 2);
    assert_eq!(monitor.tracker().sample_count(Tier::Secondary), 0);

    // A network outside both tiers records nothing
    port.set_current_network(Some("CoffeeShop"));
    monitor.tick().await.unwrap();
    assert_eq!(monitor.tracker().sample_count(Tier::Primary), 2);
    assert_eq!(monitor.tracker().sample_count(Tier::Secondary), 0);

    // The hotspot records under the secondary tier
    port.set_current_network(Some("D"));
    monitor.tick().await.unwrap();
    assert_eq!(monitor.tracker().sample_count(Tier::Secondary), 1);
}

#[tokio::test]
async fn test_disconnected_tick_records_no_latency() {
    let config = test_config();
    let port = FakeNetworkPort::new();
    port.set_current_network(Some("A"));
    let clock = FakeClock::new();
    let mut monitor = Monitor::new(&config, port, clock);

    monitor.tick().await.unwrap();
    assert_eq!(monitor.tracker().sample_count(Tier::Primary), 0);
    assert_eq!(monitor.state().consecutive_failures(), 1);
}
