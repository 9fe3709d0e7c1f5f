//! Netsentry daemon library - exposes modules for testing.

pub mod config;
pub mod failover;
pub mod latency;
pub mod monitor;
pub mod platform;
pub mod port;
pub mod recovery;
pub mod stats;
