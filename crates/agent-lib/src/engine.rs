//! Delta engine
//!
//! Owns the previous snapshot and turns cumulative interface counters into
//! per-cycle deltas. One engine instance exists per agent run; `observe` takes
//! `&mut self`, so a cycle cannot interleave with another.

use crate::models::{InterfaceCounters, Snapshot};
use std::collections::BTreeMap;

/// Stateful counter differ.
///
/// The first observed snapshot establishes the baseline: its counters are
/// passed through as absolute values and the caller is told `is_baseline` so
/// the surrounding loop can suppress transmission. Every later snapshot is
/// diffed against the previous one.
#[derive(Debug, Default)]
pub struct DeltaEngine {
    previous: Option<Snapshot>,
}

impl DeltaEngine {
    pub fn new() -> Self {
        Self { previous: None }
    }

    /// Whether a baseline snapshot has been stored.
    pub fn has_baseline(&self) -> bool {
        self.previous.is_some()
    }

    /// Fold a new snapshot into the engine.
    ///
    /// Returns the per-interface network stats for the report and whether this
    /// was the baseline cycle. Interfaces that vanished since the previous
    /// snapshot are dropped; interfaces with no history are reported with
    /// their absolute counters. The snapshot is retained as the baseline for
    /// the next call.
    pub fn observe(&mut self, snapshot: Snapshot) -> (BTreeMap<String, InterfaceCounters>, bool) {
        let (stats, is_baseline) = match &self.previous {
            None => (snapshot.network_interfaces.clone(), true),
            Some(prev) => {
                let mut stats = BTreeMap::new();
                for (name, current) in &snapshot.network_interfaces {
                    let diffed = match prev.network_interfaces.get(name) {
                        Some(baseline) => diff_counters(current, baseline),
                        // No history for this interface yet.
                        None => *current,
                    };
                    stats.insert(name.clone(), diffed);
                }
                (stats, false)
            }
        };

        self.previous = Some(snapshot);
        (stats, is_baseline)
    }
}

/// Delta for one counter pair, floored against wraparound.
///
/// A counter lower than its baseline means the interface restarted and the
/// counter began again at zero, so the new absolute value is the closest
/// honest estimate of traffic since the last sample. Never negative.
fn wrapped_delta(current: u64, baseline: u64) -> u64 {
    if current < baseline {
        current
    } else {
        current - baseline
    }
}

fn diff_counters(current: &InterfaceCounters, baseline: &InterfaceCounters) -> InterfaceCounters {
    InterfaceCounters {
        bytes_in: wrapped_delta(current.bytes_in, baseline.bytes_in),
        bytes_out: wrapped_delta(current.bytes_out, baseline.bytes_out),
        packets_in: wrapped_delta(current.packets_in, baseline.packets_in),
        packets_out: wrapped_delta(current.packets_out, baseline.packets_out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_with(counters: &[(&str, InterfaceCounters)]) -> Snapshot {
        let mut snapshot = Snapshot::empty();
        for (name, c) in counters {
            snapshot.network_interfaces.insert(name.to_string(), *c);
        }
        snapshot
    }

    fn counters(bytes_in: u64) -> InterfaceCounters {
        InterfaceCounters {
            bytes_in,
            ..Default::default()
        }
    }

    #[test]
    fn first_snapshot_is_baseline_with_absolute_counters() {
        let mut engine = DeltaEngine::new();
        assert!(!engine.has_baseline());

        let (stats, is_baseline) = engine.observe(snapshot_with(&[("eth0", counters(100))]));

        assert!(is_baseline);
        assert!(engine.has_baseline());
        assert_eq!(stats["eth0"].bytes_in, 100);
    }

    #[test]
    fn second_snapshot_yields_delta() {
        let mut engine = DeltaEngine::new();
        engine.observe(snapshot_with(&[("eth0", counters(100))]));

        let (stats, is_baseline) = engine.observe(snapshot_with(&[("eth0", counters(150))]));

        assert!(!is_baseline);
        assert_eq!(stats["eth0"].bytes_in, 50);
    }

    #[test]
    fn only_first_cycle_reports_baseline() {
        let mut engine = DeltaEngine::new();
        let flags: Vec<bool> = (0u64..4)
            .map(|i| engine.observe(snapshot_with(&[("eth0", counters(i * 10))])).1)
            .collect();
        assert_eq!(flags, vec![true, false, false, false]);
    }

    #[test]
    fn wraparound_reports_new_absolute_value() {
        let mut engine = DeltaEngine::new();
        engine.observe(snapshot_with(&[("eth0", counters(1000))]));

        let (stats, _) = engine.observe(snapshot_with(&[("eth0", counters(10))]));

        // Interface reset: counter restarted at zero.
        assert_eq!(stats["eth0"].bytes_in, 10);
    }

    #[test]
    fn wraparound_floor_applies_per_counter() {
        let mut engine = DeltaEngine::new();
        engine.observe(snapshot_with(&[(
            "eth0",
            InterfaceCounters {
                bytes_in: 1000,
                bytes_out: 200,
                packets_in: 50,
                packets_out: 5,
            },
        )]));

        let (stats, _) = engine.observe(snapshot_with(&[(
            "eth0",
            InterfaceCounters {
                bytes_in: 7,
                bytes_out: 260,
                packets_in: 60,
                packets_out: 2,
            },
        )]));

        let eth0 = stats["eth0"];
        assert_eq!(eth0.bytes_in, 7);
        assert_eq!(eth0.bytes_out, 60);
        assert_eq!(eth0.packets_in, 10);
        assert_eq!(eth0.packets_out, 2);
    }

    #[test]
    fn vanished_interface_is_dropped() {
        let mut engine = DeltaEngine::new();
        engine.observe(snapshot_with(&[
            ("eth0", counters(100)),
            ("wlan0", counters(500)),
        ]));

        let (stats, _) = engine.observe(snapshot_with(&[("eth0", counters(150))]));

        assert_eq!(stats.len(), 1);
        assert!(!stats.contains_key("wlan0"));
    }

    #[test]
    fn new_interface_is_reported_absolute() {
        let mut engine = DeltaEngine::new();
        engine.observe(snapshot_with(&[("eth0", counters(100))]));

        let (stats, _) = engine.observe(snapshot_with(&[
            ("eth0", counters(150)),
            ("wlan0", counters(777)),
        ]));

        assert_eq!(stats["eth0"].bytes_in, 50);
        assert_eq!(stats["wlan0"].bytes_in, 777);
    }

    #[test]
    fn independent_engines_do_not_share_state() {
        let mut a = DeltaEngine::new();
        let mut b = DeltaEngine::new();
        a.observe(snapshot_with(&[("eth0", counters(100))]));

        let (_, b_baseline) = b.observe(snapshot_with(&[("eth0", counters(999))]));
        assert!(b_baseline);

        let (stats, a_baseline) = a.observe(snapshot_with(&[("eth0", counters(120))]));
        assert!(!a_baseline);
        assert_eq!(stats["eth0"].bytes_in, 20);
    }
}
