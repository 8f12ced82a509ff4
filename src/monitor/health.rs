use super::aggregate::MinuteAggregate;
use crate::config::MonitorConfig;
use crate::domain::PerformanceAlert;

/// Health score (§4.9 "Health score starts at 100, deducts per active
/// alert by severity ... and deducts for high resource usage").
///
/// Open question: the resource-usage deduction is named separately from
/// the per-alert deduction without a specified formula. Read as a small
/// additional graduated penalty proportional to how far CPU/memory sit
/// above their own thresholds (capped at 10 points each), on top of (not
/// instead of) the flat per-severity penalty an active Cpu/Memory alert
/// already contributes.
pub fn score(active_alerts: &[PerformanceAlert], latest: Option<&MinuteAggregate>, config: &MonitorConfig) -> i32 {
    let mut health = 100;

    for alert in active_alerts {
        health -= alert.severity.health_penalty();
    }

    if let Some(agg) = latest {
        if agg.avg_cpu_pct > config.cpu_threshold_pct {
            let overage = (agg.avg_cpu_pct - config.cpu_threshold_pct) / config.cpu_threshold_pct * 100.0;
            health -= (overage / 10.0).min(10.0) as i32;
        }
        if agg.avg_memory_bytes > config.memory_threshold_bytes {
            let overage = (agg.avg_memory_bytes - config.memory_threshold_bytes) as f64 / config.memory_threshold_bytes as f64 * 100.0;
            health -= (overage / 10.0).min(10.0) as i32;
        }
    }

    health.clamp(0, 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AlertSeverity, AlertType};
    use chrono::Utc;

    fn alert(severity: AlertSeverity) -> PerformanceAlert {
        PerformanceAlert {
            id: "a".to_string(),
            alert_type: AlertType::Cpu,
            severity,
            metric_name: "cpu".to_string(),
            value: 90.0,
            threshold: 80.0,
            message: String::new(),
            timestamp: Utc::now(),
            resolved: false,
            resolved_at: None,
        }
    }

    #[test]
    fn no_alerts_is_perfect_health() {
        assert_eq!(score(&[], None, &MonitorConfig::default()), 100);
    }

    #[test]
    fn critical_and_high_stack() {
        let alerts = vec![alert(AlertSeverity::Critical), alert(AlertSeverity::High)];
        assert_eq!(score(&alerts, None, &MonitorConfig::default()), 50);
    }

    #[test]
    fn resource_overage_adds_further_penalty() {
        let config = MonitorConfig::default();
        let mut agg = MinuteAggregate::default();
        agg.avg_cpu_pct = config.cpu_threshold_pct * 1.5;
        assert!(score(&[], Some(&agg), &config) < 100);
    }
}
