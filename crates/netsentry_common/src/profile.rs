//! Known-network profiles and preference tiers.

use serde::{Deserialize, Serialize};

/// Preference class of a known wireless network.
///
/// PRIMARY networks form an ordered preference list; the SECONDARY network
/// is the single last-resort fallback (typically a phone hotspot).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Primary,
    Secondary,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "PRIMARY",
            Self::Secondary => "SECONDARY",
        }
    }
}

/// A known wireless network. Immutable after configuration load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkProfile {
    pub ssid: String,
    /// Empty for open networks.
    pub password: String,
    pub tier: Tier,
    /// Preference order within the tier; lower is tried first.
    pub rank: usize,
}

impl NetworkProfile {
    pub fn primary(ssid: impl Into<String>, password: impl Into<String>, rank: usize) -> Self {
        Self {
            ssid: ssid.into(),
            password: password.into(),
            tier: Tier::Primary,
            rank,
        }
    }

    pub fn secondary(ssid: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            ssid: ssid.into(),
            password: password.into(),
            tier: Tier::Secondary,
            rank: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_as_str() {
        assert_eq!(Tier::Primary.as_str(), "PRIMARY");
        assert_eq!(Tier::Secondary.as_str(), "SECONDARY");
    }

    #[test]
    fn test_profile_constructors() {
        let p = NetworkProfile::primary("Home-5G", "hunter2", 1);
        assert_eq!(p.tier, Tier::Primary);
        assert_eq!(p.rank, 1);
        assert!(!p.is_open());

        let s = NetworkProfile::secondary("Hotspot", "");
        assert_eq!(s.tier, Tier::Secondary);
        assert_eq!(s.rank, 0);
        assert!(s.is_open());
    }
}
