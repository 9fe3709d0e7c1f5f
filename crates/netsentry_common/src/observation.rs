//! Per-tick connectivity observations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The result of one monitoring tick's connectivity check.
///
/// Produced once per tick and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeObservation {
    pub timestamp: DateTime<Utc>,
    /// SSID the interface reports being associated with, if any.
    pub observed_ssid: Option<String>,
    pub connected: bool,
    /// Round-trip latency of the probe; None when disconnected.
    pub latency_ms: Option<f64>,
}

impl ProbeObservation {
    pub fn connected(observed_ssid: Option<String>, latency_ms: f64) -> Self {
        Self {
            timestamp: Utc::now(),
            observed_ssid,
            connected: true,
            latency_ms: Some(latency_ms),
        }
    }

    pub fn disconnected(observed_ssid: Option<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            observed_ssid,
            connected: false,
            latency_ms: None,
        }
    }

    /// Display name for logging: the SSID or a placeholder.
    pub fn ssid_or_unknown(&self) -> &str {
        self.observed_ssid.as_deref().unwrap_or("(none)")
    }
}
