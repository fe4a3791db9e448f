use std::sync::Mutex;

use serde::Serialize;

/// Counters accumulated over one engine lifetime. Guarded by a mutex so a
/// shared engine behind a lock can be snapshotted from any thread.
pub struct EngineMetrics {
    inner: Mutex<Counters>,
}

#[derive(Default)]
struct Counters {
    commands_applied: usize,
    ticks_applied: usize,
    starts_rejected: usize,
    hazards_spawned: usize,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct MetricsSnapshot {
    pub commands_applied: usize,
    pub ticks_applied: usize,
    pub starts_rejected: usize,
    pub hazards_spawned: usize,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Counters::default()),
        }
    }

    pub fn record_command(&self) {
        if let Ok(mut counters) = self.inner.lock() {
            counters.commands_applied += 1;
        }
    }

    pub fn record_tick(&self) {
        if let Ok(mut counters) = self.inner.lock() {
            counters.ticks_applied += 1;
        }
    }

    pub fn record_rejected_start(&self) {
        if let Ok(mut counters) = self.inner.lock() {
            counters.starts_rejected += 1;
        }
    }

    pub fn record_hazards_spawned(&self, count: usize) {
        if let Ok(mut counters) = self.inner.lock() {
            counters.hazards_spawned += count;
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        match self.inner.lock() {
            Ok(counters) => MetricsSnapshot {
                commands_applied: counters.commands_applied,
                ticks_applied: counters.ticks_applied,
                starts_rejected: counters.starts_rejected,
                hazards_spawned: counters.hazards_spawned,
            },
            Err(_) => MetricsSnapshot {
                commands_applied: 0,
                ticks_applied: 0,
                starts_rejected: 0,
                hazards_spawned: 0,
            },
        }
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_independently() {
        let metrics = EngineMetrics::new();
        metrics.record_command();
        metrics.record_command();
        metrics.record_tick();
        metrics.record_rejected_start();
        metrics.record_hazards_spawned(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.commands_applied, 2);
        assert_eq!(snapshot.ticks_applied, 1);
        assert_eq!(snapshot.starts_rejected, 1);
        assert_eq!(snapshot.hazards_spawned, 3);
    }
}
