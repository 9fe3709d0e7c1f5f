//! Rolling latency history per network tier.
//!
//! Purely observational: the averages feed the status log line and nothing
//! else. Decision logic never reads them.

use netsentry_common::Tier;
use std::collections::VecDeque;

/// Fixed-capacity FIFO of recent latency samples, oldest evicted first.
#[derive(Debug, Clone)]
pub struct LatencyWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl LatencyWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, latency_ms: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(latency_ms);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Arithmetic mean over the current window.
    pub fn average(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
    }

    pub fn samples(&self) -> impl Iterator<Item = &f64> {
        self.samples.iter()
    }
}

/// One latency window per tier.
#[derive(Debug, Clone)]
pub struct LatencyTracker {
    primary: LatencyWindow,
    secondary: LatencyWindow,
}

impl LatencyTracker {
    pub fn new(window_size: usize) -> Self {
        Self {
            primary: LatencyWindow::new(window_size),
            secondary: LatencyWindow::new(window_size),
        }
    }

    pub fn record(&mut self, tier: Tier, latency_ms: f64) {
        self.window_mut(tier).push(latency_ms);
    }

    pub fn average(&self, tier: Tier) -> Option<f64> {
        self.window(tier).average()
    }

    pub fn sample_count(&self, tier: Tier) -> usize {
        self.window(tier).len()
    }

    fn window(&self, tier: Tier) -> &LatencyWindow {
        match tier {
            Tier::Primary => &self.primary,
            Tier::Secondary => &self.secondary,
        }
    }

    fn window_mut(&mut self, tier: Tier) -> &mut LatencyWindow {
        match tier {
            Tier::Primary => &mut self.primary,
            Tier::Secondary => &mut self.secondary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_window_fifo_eviction() {
        let mut window = LatencyWindow::new(3);
        for sample in [1.0, 2.0, 3.0, 4.0, 5.0] {
            window.push(sample);
        }
        // Only the last 3 retained, oldest first
        let kept: Vec<f64> = window.samples().copied().collect();
        assert_eq!(kept, vec![3.0, 4.0, 5.0]);
        assert_eq!(window.len(), 3);
    }

    #[test]
    fn test_window_average() {
        let mut window = LatencyWindow::new(10);
        assert!(window.average().is_none());

        window.push(10.0);
        window.push(20.0);
        assert_relative_eq!(window.average().unwrap(), 15.0);
    }

    #[test]
    fn test_tracker_tiers_independent() {
        let mut tracker = LatencyTracker::new(5);
        tracker.record(Tier::Primary, 10.0);
        tracker.record(Tier::Primary, 30.0);
        tracker.record(Tier::Secondary, 100.0);

        assert_relative_eq!(tracker.average(Tier::Primary).unwrap(), 20.0);
        assert_relative_eq!(tracker.average(Tier::Secondary).unwrap(), 100.0);
        assert_eq!(tracker.sample_count(Tier::Primary), 2);
        assert_eq!(tracker.sample_count(Tier::Secondary), 1);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut window = LatencyWindow::new(0);
        window.push(1.0);
        window.push(2.0);
        assert_eq!(window.len(), 1);
        assert_relative_eq!(window.average().unwrap(), 2.0);
    }
}
