/// Per-minute rollup of the 5-second snapshots collected in that window
/// (§4.9 "Every minute, aggregates averages and percentiles ... and
/// persists").
#[derive(Debug, Clone, Default)]
pub struct MinuteAggregate {
    pub avg_parse_latency_ms: f64,
    pub p95_parse_latency_ms: f64,
    pub p99_parse_latency_ms: f64,
    pub avg_stream_lag_ms: f64,
    pub p95_stream_lag_ms: f64,
    pub missed_tx_rate: f64,
    pub max_queue_depth: usize,
    pub avg_cpu_pct: f64,
    pub avg_memory_bytes: u64,
}

/// Nearest-rank percentile over `values`, sorted ascending. Returns 0.0 for
/// an empty slice rather than panicking: a quiet minute has nothing to
/// aggregate.
pub fn percentile(values: &mut [f64], pct: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let rank = ((pct / 100.0) * (values.len() - 1) as f64).round() as usize;
    values[rank.min(values.len() - 1)]
}

pub fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

impl MinuteAggregate {
    pub fn from_snapshots(snapshots: &[super::recorder::Snapshot]) -> Self {
        let mut parse_latencies: Vec<f64> = snapshots.iter().flat_map(|s| s.parse_latencies_ms.iter().copied()).collect();
        let mut stream_lags: Vec<f64> = snapshots.iter().flat_map(|s| s.stream_lags_ms.iter().copied()).collect();

        let total_seen: u64 = snapshots.iter().map(|s| s.transactions_seen).sum();
        let total_missed: u64 = snapshots.iter().map(|s| s.transactions_missed).sum();
        let missed_tx_rate = if total_seen == 0 { 0.0 } else { total_missed as f64 / total_seen as f64 };

        let max_queue_depth = snapshots
            .iter()
            .flat_map(|s| s.queue_depths.values().copied())
            .max()
            .unwrap_or(0);

        let cpu_samples: Vec<f64> = snapshots.iter().map(|s| s.cpu_pct).collect();
        let mem_samples: Vec<u64> = snapshots.iter().map(|s| s.memory_bytes).collect();
        let avg_memory_bytes = if mem_samples.is_empty() { 0 } else { mem_samples.iter().sum::<u64>() / mem_samples.len() as u64 };

        Self {
            avg_parse_latency_ms: average(&parse_latencies),
            p95_parse_latency_ms: percentile(&mut parse_latencies, 95.0),
            p99_parse_latency_ms: percentile(&mut parse_latencies, 99.0),
            avg_stream_lag_ms: average(&stream_lags),
            p95_stream_lag_ms: percentile(&mut stream_lags, 95.0),
            missed_tx_rate,
            max_queue_depth,
            avg_cpu_pct: average(&cpu_samples),
            avg_memory_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_of_empty_is_zero() {
        let mut values: Vec<f64> = vec![];
        assert_eq!(percentile(&mut values, 95.0), 0.0);
    }

    #[test]
    fn p99_of_ten_values_picks_near_top() {
        let mut values: Vec<f64> = (1..=10).map(|v| v as f64).collect();
        assert_eq!(percentile(&mut values, 99.0), 10.0);
    }

    #[test]
    fn aggregate_combines_multiple_snapshots() {
        let mut a = super::super::recorder::Snapshot::default();
        a.parse_latencies_ms = vec![10.0, 20.0];
        a.transactions_seen = 10;
        a.transactions_missed = 1;
        a.queue_depths.insert("batch".to_string(), 5);
        a.cpu_pct = 10.0;
        a.memory_bytes = 1000;

        let mut b = super::super::recorder::Snapshot::default();
        b.parse_latencies_ms = vec![30.0];
        b.transactions_seen = 10;
        b.transactions_missed = 0;
        b.queue_depths.insert("batch".to_string(), 9);
        b.cpu_pct = 20.0;
        b.memory_bytes = 2000;

        let agg = MinuteAggregate::from_snapshots(&[a, b]);
        assert_eq!(agg.avg_parse_latency_ms, 20.0);
        assert_eq!(agg.missed_tx_rate, 0.05);
        assert_eq!(agg.max_queue_depth, 9);
        assert_eq!(agg.avg_cpu_pct, 15.0);
        assert_eq!(agg.avg_memory_bytes, 1500);
    }
}
