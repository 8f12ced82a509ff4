use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Raw per-5-second snapshot (§4.9 "Collects per-5-second snapshots").
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub parse_latencies_ms: Vec<f64>,
    pub stream_lags_ms: Vec<f64>,
    pub transactions_seen: u64,
    pub transactions_missed: u64,
    pub queue_depths: HashMap<String, usize>,
    pub memory_bytes: u64,
    pub cpu_pct: f64,
}

/// In-process sample buffer other components push into; drained every
/// `snapshot_interval_secs` by the monitor loop. Cheap to clone and share
/// (`Arc<MetricsRecorder>`) across every task that wants to report a
/// latency or a queue depth.
#[derive(Default)]
pub struct MetricsRecorder {
    parse_latencies_ms: Mutex<Vec<f64>>,
    stream_lags_ms: Mutex<Vec<f64>>,
    transactions_seen: AtomicU64,
    transactions_missed: AtomicU64,
    queue_depths: Mutex<HashMap<String, usize>>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_parse_latency_ms(&self, latency_ms: f64) {
        self.parse_latencies_ms.lock().push(latency_ms);
        self.transactions_seen.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_parse_failure(&self) {
        self.transactions_missed.fetch_add(1, Ordering::Relaxed);
        self.transactions_seen.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stream_lag_ms(&self, lag_ms: f64) {
        self.stream_lags_ms.lock().push(lag_ms);
    }

    pub fn set_queue_depth(&self, name: &str, depth: usize) {
        self.queue_depths.lock().insert(name.to_string(), depth);
    }

    /// Drains accumulated samples into a [`Snapshot`], resetting the
    /// buffers for the next interval. `cpu_pct`/`memory_bytes` are supplied
    /// by the caller since they come from the OS sampler, not app-level
    /// instrumentation.
    pub fn drain(&self, cpu_pct: f64, memory_bytes: u64) -> Snapshot {
        Snapshot {
            parse_latencies_ms: std::mem::take(&mut self.parse_latencies_ms.lock()),
            stream_lags_ms: std::mem::take(&mut self.stream_lags_ms.lock()),
            transactions_seen: self.transactions_seen.swap(0, Ordering::Relaxed),
            transactions_missed: self.transactions_missed.swap(0, Ordering::Relaxed),
            queue_depths: self.queue_depths.lock().clone(),
            memory_bytes,
            cpu_pct,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_resets_counters_and_returns_samples() {
        let recorder = MetricsRecorder::new();
        recorder.record_parse_latency_ms(10.0);
        recorder.record_parse_latency_ms(20.0);
        recorder.record_parse_failure();
        recorder.set_queue_depth("batch", 5);

        let snapshot = recorder.drain(12.5, 1024);
        assert_eq!(snapshot.parse_latencies_ms, vec![10.0, 20.0]);
        assert_eq!(snapshot.transactions_seen, 3);
        assert_eq!(snapshot.transactions_missed, 1);
        assert_eq!(snapshot.queue_depths.get("batch"), Some(&5));

        let second = recorder.drain(0.0, 0);
        assert!(second.parse_latencies_ms.is_empty());
        assert_eq!(second.transactions_seen, 0);
    }
}
