//! macOS adapter for the network port.
//!
//! Shells out to `system_profiler`, `ping`, and `networksetup`. Every
//! command runs under an explicit timeout; failures surface to the core as
//! `None`/`false` results or a logged `PortError`, never as a crash.

use crate::config::Config;
use crate::port::NetworkPort;
use async_trait::async_trait;
use netsentry_common::{NetworkProfile, PortError};
use regex::Regex;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Security mode used when registering preferred networks.
const SECURITY_MODE: &str = "WPA2/WPA3 Personal";

pub struct MacosAirportPort {
    interface: String,
    query_timeout: Duration,
    radio_toggle_gap: Duration,
    latency_re: Regex,
}

impl MacosAirportPort {
    pub fn new(config: &Config) -> Self {
        Self {
            interface: config.interface.name.clone(),
            query_timeout: config.query_timeout(),
            radio_toggle_gap: config.radio_toggle_gap(),
            latency_re: Regex::new(r"time=([\d.]+)\s*ms").unwrap(),
        }
    }

    async fn run_command(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output, PortError> {
        debug!("running: {} {}", program, args.join(" "));
        let result = tokio::time::timeout(
            timeout,
            Command::new(program)
                .args(args)
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .output(),
        )
        .await;
        match result {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(PortError::Io(e)),
            Err(_) => Err(PortError::Timeout(timeout.as_secs())),
        }
    }
}

#[async_trait]
impl NetworkPort for MacosAirportPort {
    async fn current_network(&self) -> Option<String> {
        let output = match self
            .run_command("system_profiler", &["SPAirPortDataType"], self.query_timeout)
            .await
        {
            Ok(output) => output,
            Err(e) => {
                debug!("network query failed: {e}");
                return None;
            }
        };
        if !output.status.success() {
            return None;
        }
        parse_current_ssid(&String::from_utf8_lossy(&output.stdout))
    }

    async fn probe(&self, host: &str, timeout: Duration) -> Option<f64> {
        let wait_ms = timeout.as_millis().to_string();
        // Give the command itself a little headroom over the ping wait
        let command_timeout = timeout + Duration::from_secs(1);
        let output = match self
            .run_command("ping", &["-c", "1", "-W", &wait_ms, host], command_timeout)
            .await
        {
            Ok(output) => output,
            Err(e) => {
                debug!("probe failed: {e}");
                return None;
            }
        };
        if !output.status.success() {
            return None;
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        // A reply with no parsable round-trip time still counts as connected
        Some(parse_latency(&self.latency_re, &stdout).unwrap_or(0.0))
    }

    async fn set_preferred_networks(&self, profiles: &[NetworkProfile]) -> Result<(), PortError> {
        debug!("ranking {} known networks at the OS level", profiles.len());
        for profile in profiles {
            // Drop any existing entry so the re-add lands at the right index
            let _ = self
                .run_command(
                    "networksetup",
                    &[
                        "-removepreferredwirelessnetwork",
                        &self.interface,
                        &profile.ssid,
                    ],
                    self.query_timeout,
                )
                .await;
        }

        let mut ranked = 0usize;
        for (index, profile) in profiles.iter().enumerate() {
            let index_str = index.to_string();
            let mut args = vec![
                "-addpreferredwirelessnetworkatindex",
                self.interface.as_str(),
                profile.ssid.as_str(),
                index_str.as_str(),
                SECURITY_MODE,
            ];
            if !profile.password.is_empty() {
                args.push(profile.password.as_str());
            }
            match self
                .run_command("networksetup", &args, self.query_timeout)
                .await
            {
                Ok(output) if output.status.success() => {
                    debug!("preferred network '{}' ranked at {}", profile.ssid, index);
                    ranked += 1;
                }
                Ok(output) => warn!(
                    "could not rank '{}' at index {}: {}",
                    profile.ssid,
                    index,
                    String::from_utf8_lossy(&output.stderr).trim(),
                ),
                Err(e) => warn!("could not rank '{}' at index {}: {}", profile.ssid, index, e),
            }
        }

        if ranked == 0 && !profiles.is_empty() {
            return Err(PortError::Command(
                "no preferred network could be ranked".to_string(),
            ));
        }
        Ok(())
    }

    async fn soft_reselect(&self) {
        debug!(
            "cycling radio on {} to trigger OS network reselection",
            self.interface
        );
        if let Err(e) = self
            .run_command(
                "networksetup",
                &["-setairportpower", &self.interface, "off"],
                self.query_timeout,
            )
            .await
        {
            warn!("radio off failed: {e}");
        }
        tokio::time::sleep(self.radio_toggle_gap).await;
        if let Err(e) = self
            .run_command(
                "networksetup",
                &["-setairportpower", &self.interface, "on"],
                self.query_timeout,
            )
            .await
        {
            warn!("radio on failed: {e}");
        }
    }

    async fn force_connect(&self, ssid: &str, password: &str, timeout: Duration) -> bool {
        let mut args = vec!["-setairportnetwork", self.interface.as_str(), ssid];
        if !password.is_empty() {
            args.push(password);
        }
        match self.run_command("networksetup", &args, timeout).await {
            Ok(output) if output.status.success() => true,
            Ok(output) => {
                warn!(
                    "force connect to '{}' rejected: {}",
                    ssid,
                    String::from_utf8_lossy(&output.stderr).trim(),
                );
                false
            }
            Err(e) => {
                warn!("force connect to '{}' failed: {}", ssid, e);
                false
            }
        }
    }
}

/// Extract the SSID from `system_profiler SPAirPortDataType` output: the
/// line after the "Current Network Information:" header, minus its trailing
/// colon.
fn parse_current_ssid(output: &str) -> Option<String> {
    let lines: Vec<&str> = output.lines().collect();
    for (i, line) in lines.iter().enumerate() {
        if !line.contains("Current Network Information:") {
            continue;
        }
        if let Some(next) = lines.get(i + 1) {
            let ssid = next.trim().trim_end_matches(':');
            if !ssid.is_empty() && !next.contains("Status:") {
                return Some(ssid.to_string());
            }
        }
    }
    None
}

/// Extract the round-trip time from ping output.
fn parse_latency(re: &Regex, output: &str) -> Option<f64> {
    re.captures(output)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}
