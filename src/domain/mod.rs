//! Shared data model for the ingestion pipeline (SPEC_FULL.md §3).
//!
//! These types are the boundary between the parser (C2), the trade handler
//! (C5), the persistence layer (C6) and the recovery engine (C7). They carry
//! no behaviour beyond small helpers; the arithmetic lives in [`crate::price`].

mod event;
mod program;
mod token;
mod trade;

pub use event::{FeeEvent, FeeKind, LiquidityEvent, LiquidityKind, PoolCreatedEvent, GraduationEvent};
pub use program::Program;
pub use token::Token;
pub use trade::{Trade, TradeSide};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single reserve observation for a pool or bonding curve, keyed by
/// (pool address, slot). Append-only; the latest row per mint is
/// authoritative (§3 "Pool state snapshot").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolStateSnapshot {
    pub pool_address: String,
    pub mint: String,
    pub virtual_sol_reserves: u64,
    pub virtual_token_reserves: u64,
    pub real_sol_reserves: u64,
    pub real_token_reserves: u64,
    pub pool_open: bool,
    pub slot: u64,
    pub timestamp: DateTime<Utc>,
}

/// A mint's most recently known reserves, as tracked by the pool state cache
/// (C4). Smaller than [`PoolStateSnapshot`]: no timestamp bookkeeping beyond
/// the slot, since the cache only ever needs "is this newer".
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolReserves {
    pub virtual_sol_reserves: u64,
    pub virtual_token_reserves: u64,
    pub real_sol_reserves: u64,
    pub real_token_reserves: u64,
    pub slot: u64,
}

/// A recovery-queue item (§3 "Recovery-queue item"). Transient, in-memory
/// only; never persisted directly (the batch log is what gets written).
#[derive(Debug, Clone)]
pub struct RecoveryQueueItem {
    pub mint: String,
    pub priority: u8,
    pub attempts: u32,
    pub last_attempt: Option<DateTime<Utc>>,
    pub added_at: DateTime<Utc>,
}

impl RecoveryQueueItem {
    pub fn new(mint: String, priority: u8) -> Self {
        Self {
            mint,
            priority: priority.min(100),
            attempts: 0,
            last_attempt: None,
            added_at: Utc::now(),
        }
    }
}

/// Outcome of a single recovery-queue scan + worker pass, persisted to the
/// `recovery_batch_log` / `stale_detection_runs` tables (§6, §4.7
/// "Recovery-batch log").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryBatchLog {
    pub batch_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub tokens_checked: u32,
    pub tokens_recovered: u32,
    pub tokens_failed: u32,
    pub external_queries: u32,
    pub duration_ms: u64,
    pub status: BatchStatus,
}

/// Per-mint recovery bookkeeping, distinct from the per-batch
/// [`RecoveryBatchLog`]: one row per mint, upserted after every recovery
/// attempt whether it succeeds or fails (§3 "Recovery-queue item" /
/// per-mint progress, persisted to the `recovery_progress` table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryProgress {
    pub mint: String,
    pub last_attempt_at: DateTime<Utc>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub last_source: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchStatus {
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BatchStatus::Running => "running",
            BatchStatus::Completed => "completed",
            BatchStatus::Cancelled => "cancelled",
            BatchStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// A span of time during which the stream was down, recorded so the
/// subscription manager (and the recovery engine's startup pass) can reason
/// about how stale persisted state might be (§6 `downtime_periods`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DowntimePeriod {
    pub program: Program,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub last_slot_before: Option<u64>,
    pub reason: String,
}

/// A performance alert (§3, C9). Keyed by (alert_type, metric_name); an
/// update to an already-active alert refreshes `value`/`timestamp` rather
/// than creating a duplicate row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceAlert {
    pub id: String,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub metric_name: String,
    pub value: f64,
    pub threshold: f64,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertType {
    ParseLatency,
    StreamLag,
    MissedTxRate,
    Memory,
    Cpu,
    QueueDepth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertSeverity {
    /// Health-score deduction per active alert of this severity (§4.9).
    pub fn health_penalty(self) -> i32 {
        match self {
            AlertSeverity::Critical => 30,
            AlertSeverity::High => 20,
            AlertSeverity::Medium => 10,
            AlertSeverity::Low => 5,
        }
    }
}
