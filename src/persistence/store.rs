use super::queue::PendingRow;
use super::schema;
use crate::domain::{
    AlertSeverity, AlertType, BatchStatus, DowntimePeriod, FeeEvent, FeeKind, LiquidityEvent, LiquidityKind,
    PerformanceAlert, PoolStateSnapshot, Program, RecoveryBatchLog, RecoveryProgress, Token, Trade,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::str::FromStr;
use std::sync::Mutex;

/// The sqlite-backed store. Holds the one connection the process uses;
/// callers serialize through the `Mutex` rather than opening one
/// connection per writer.
pub struct PersistenceStore {
    conn: Mutex<Connection>,
}

unsafe impl Send for PersistenceStore {}
unsafe impl Sync for PersistenceStore {}

impl PersistenceStore {
    pub fn new(db_path: &str) -> Result<Self> {
        if let Some(parent) = std::path::Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| format!("creating database directory {parent:?}"))?;
            }
        }
        let conn = Connection::open(db_path).with_context(|| format!("opening database at {db_path}"))?;
        schema::initialize(&conn).context("initializing schema")?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Inserts an entire drained batch inside a single transaction (§4.6).
    /// Returns the number of rows inserted (conflicts that resolved to
    /// `DO NOTHING` still count as handled, not as failures).
    pub fn insert_batch(&self, rows: &[PendingRow]) -> Result<usize> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let mut inserted = 0usize;

        for row in rows {
            match row {
                PendingRow::Trade(trade) => {
                    Self::ensure_token_placeholder(&tx, &trade.mint, trade.program, trade.slot)?;
                    Self::insert_trade(&tx, trade)?;
                    inserted += 1;
                }
                PendingRow::Liquidity(event) => {
                    Self::insert_liquidity(&tx, event)?;
                    inserted += 1;
                }
                PendingRow::Fee(event) => {
                    Self::insert_fee(&tx, event)?;
                    inserted += 1;
                }
                PendingRow::TokenUpsert(token) => {
                    Self::upsert_token(&tx, token)?;
                    inserted += 1;
                }
                PendingRow::PoolSnapshot { snapshot, .. } => {
                    Self::insert_pool_snapshot(&tx, snapshot)?;
                    inserted += 1;
                }
            }
        }

        tx.commit()?;
        Ok(inserted)
    }

    /// Creates a placeholder token row on trade insert if the token is
    /// absent (§4.6), in application code rather than a SQL trigger, so the
    /// placeholder's default decimals/supply can come from [`Token::placeholder`].
    fn ensure_token_placeholder(tx: &rusqlite::Transaction, mint: &str, program: Program, slot: u64) -> Result<()> {
        let exists: bool = tx.query_row("SELECT 1 FROM tokens WHERE mint = ?1", params![mint], |_| Ok(true)).unwrap_or(false);
        if exists {
            return Ok(());
        }
        let placeholder = Token::placeholder(mint, program, slot);
        Self::upsert_token(tx, &placeholder)
    }

    fn insert_trade(tx: &rusqlite::Transaction, trade: &Trade) -> Result<()> {
        tx.execute(
            "INSERT INTO trades (
                signature, mint, program, side, user, sol_amount, token_amount,
                price_sol, price_usd, market_cap_usd, virtual_sol_reserves, virtual_token_reserves,
                bonding_curve_progress, slot, block_time, price_impact_pct, slippage_pct,
                spot_price_sol, execution_price_sol, min_received, max_received
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20,?21)
            ON CONFLICT(signature) DO NOTHING",
            params![
                trade.signature,
                trade.mint,
                trade.program.as_str(),
                trade.side.as_str(),
                trade.user,
                trade.sol_amount as i64,
                trade.token_amount as i64,
                trade.price_sol,
                trade.price_usd,
                trade.market_cap_usd,
                trade.virtual_sol_reserves as i64,
                trade.virtual_token_reserves as i64,
                trade.bonding_curve_progress,
                trade.slot as i64,
                trade.block_time.to_rfc3339(),
                trade.price_impact_pct,
                trade.slippage_pct,
                trade.spot_price_sol,
                trade.execution_price_sol,
                trade.min_received.map(|v| v as i64),
                trade.max_received.map(|v| v as i64),
            ],
        )?;
        Ok(())
    }

    fn insert_liquidity(tx: &rusqlite::Transaction, event: &LiquidityEvent) -> Result<()> {
        let kind = match event.kind {
            LiquidityKind::Deposit => "deposit",
            LiquidityKind::Withdraw => "withdraw",
        };
        tx.execute(
            "INSERT INTO liquidity_events (
                signature, kind, pool_address, mint, user, lp_amount, sol_amount, token_amount,
                sol_reserves_after, token_reserves_after, value_usd, slot, block_time
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13)
            ON CONFLICT(signature) DO NOTHING",
            params![
                event.signature,
                kind,
                event.pool_address,
                event.mint,
                event.user,
                event.lp_amount as i64,
                event.sol_amount as i64,
                event.token_amount as i64,
                event.sol_reserves_after as i64,
                event.token_reserves_after as i64,
                event.value_usd,
                event.slot as i64,
                event.block_time.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn insert_fee(tx: &rusqlite::Transaction, event: &FeeEvent) -> Result<()> {
        let event_type = match event.kind {
            FeeKind::CreatorFee => "creator_fee",
            FeeKind::ProtocolFee => "protocol_fee",
        };
        tx.execute(
            "INSERT INTO fee_events (
                signature, event_type, pool_address, mint, recipient, sol_fee_amount, token_fee_amount,
                sol_reserves_after, token_reserves_after, slot, block_time
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)
            ON CONFLICT(signature, event_type) DO NOTHING",
            params![
                event.signature,
                event_type,
                event.pool_address,
                event.mint,
                event.recipient,
                event.sol_fee_amount as i64,
                event.token_fee_amount as i64,
                event.sol_reserves_after as i64,
                event.token_reserves_after as i64,
                event.slot as i64,
                event.block_time.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn upsert_token(tx: &rusqlite::Transaction, token: &Token) -> Result<()> {
        tx.execute(
            "INSERT INTO tokens (
                mint, symbol, name, uri, program, first_seen_slot, first_seen_time,
                latest_price_sol, latest_price_usd, latest_market_cap_usd, bonding_curve_progress,
                bonding_curve_complete, graduated, graduation_slot, graduation_signature, creator,
                decimals, total_supply, enriched, last_trade_time, last_price_update_time,
                price_source, is_stale, should_remove
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20,?21,?22,?23,?24)
            ON CONFLICT(mint) DO UPDATE SET
                symbol = excluded.symbol,
                name = excluded.name,
                uri = excluded.uri,
                program = excluded.program,
                latest_price_sol = excluded.latest_price_sol,
                latest_price_usd = excluded.latest_price_usd,
                latest_market_cap_usd = excluded.latest_market_cap_usd,
                bonding_curve_progress = excluded.bonding_curve_progress,
                bonding_curve_complete = excluded.bonding_curve_complete,
                graduated = excluded.graduated,
                graduation_slot = excluded.graduation_slot,
                graduation_signature = excluded.graduation_signature,
                creator = excluded.creator,
                enriched = excluded.enriched,
                last_trade_time = excluded.last_trade_time,
                last_price_update_time = excluded.last_price_update_time,
                price_source = excluded.price_source,
                is_stale = excluded.is_stale,
                should_remove = excluded.should_remove",
            params![
                token.mint,
                token.symbol,
                token.name,
                token.uri,
                token.program.as_str(),
                token.first_seen_slot as i64,
                token.first_seen_time.to_rfc3339(),
                token.latest_price_sol,
                token.latest_price_usd,
                token.latest_market_cap_usd,
                token.bonding_curve_progress,
                token.bonding_curve_complete,
                token.graduated,
                token.graduation_slot.map(|v| v as i64),
                token.graduation_signature,
                token.creator,
                token.decimals,
                token.total_supply as i64,
                token.enriched,
                token.last_trade_time.map(|t| t.to_rfc3339()),
                token.last_price_update_time.map(|t| t.to_rfc3339()),
                token.price_source,
                token.is_stale,
                token.should_remove,
            ],
        )?;
        Ok(())
    }

    fn insert_pool_snapshot(tx: &rusqlite::Transaction, snapshot: &PoolStateSnapshot) -> Result<()> {
        tx.execute(
            "INSERT INTO pool_state_snapshots (
                pool_address, slot, mint, virtual_sol_reserves, virtual_token_reserves,
                real_sol_reserves, real_token_reserves, pool_open, timestamp
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)
            ON CONFLICT(pool_address, slot) DO NOTHING",
            params![
                snapshot.pool_address,
                snapshot.slot as i64,
                snapshot.mint,
                snapshot.virtual_sol_reserves as i64,
                snapshot.virtual_token_reserves as i64,
                snapshot.real_sol_reserves as i64,
                snapshot.real_token_reserves as i64,
                snapshot.pool_open,
                snapshot.timestamp.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn token_by_mint(&self, mint: &str) -> Result<Option<Token>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT mint, symbol, name, uri, program, first_seen_slot, first_seen_time,
                    latest_price_sol, latest_price_usd, latest_market_cap_usd, bonding_curve_progress,
                    bonding_curve_complete, graduated, graduation_slot, graduation_signature, creator,
                    decimals, total_supply, enriched, last_trade_time, last_price_update_time,
                    price_source, is_stale, should_remove
             FROM tokens WHERE mint = ?1",
        )?;
        let mut rows = stmt.query(params![mint])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Token {
                mint: row.get(0)?,
                symbol: row.get(1)?,
                name: row.get(2)?,
                uri: row.get(3)?,
                program: Program::from_str(&row.get::<_, String>(4)?).map_err(anyhow::Error::msg)?,
                first_seen_slot: row.get::<_, i64>(5)? as u64,
                first_seen_time: parse_rfc3339(row.get::<_, String>(6)?)?,
                latest_price_sol: row.get(7)?,
                latest_price_usd: row.get(8)?,
                latest_market_cap_usd: row.get(9)?,
                bonding_curve_progress: row.get(10)?,
                bonding_curve_complete: row.get(11)?,
                graduated: row.get(12)?,
                graduation_slot: row.get::<_, Option<i64>>(13)?.map(|v| v as u64),
                graduation_signature: row.get(14)?,
                creator: row.get(15)?,
                decimals: row.get(16)?,
                total_supply: row.get::<_, i64>(17)? as u64,
                enriched: row.get(18)?,
                last_trade_time: row.get::<_, Option<String>>(19)?.map(parse_rfc3339).transpose()?,
                last_price_update_time: row.get::<_, Option<String>>(20)?.map(parse_rfc3339).transpose()?,
                price_source: row.get(21)?,
                is_stale: row.get(22)?,
                should_remove: row.get(23)?,
            }))
        } else {
            Ok(None)
        }
    }

    pub fn cleanup_old_data(&self, max_age_days: i64) -> Result<u64> {
        let conn = self.conn.lock().unwrap();
        let cutoff = (chrono::Utc::now() - chrono::Duration::days(max_age_days)).to_rfc3339();
        let affected = conn.execute(
            "DELETE FROM trades WHERE block_time < ?1",
            params![cutoff],
        )?;
        Ok(affected as u64)
    }

    /// Tokens eligible for the steady-state stale scan (§4.7): at or above
    /// the market-cap floor and either never price-updated or updated
    /// before `cutoff`.
    pub fn stale_candidates(&self, mcap_floor: f64, cutoff: DateTime<Utc>) -> Result<Vec<Token>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT mint FROM tokens
             WHERE latest_market_cap_usd >= ?1
               AND (last_price_update_time IS NULL OR last_price_update_time < ?2)
               AND should_remove = 0",
        )?;
        let mints: Vec<String> = stmt
            .query_map(params![mcap_floor, cutoff.to_rfc3339()], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;
        drop(stmt);
        drop(conn);

        let mut tokens = Vec::with_capacity(mints.len());
        for mint in mints {
            if let Some(token) = self.token_by_mint(&mint)? {
                tokens.push(token);
            }
        }
        Ok(tokens)
    }

    /// Every tracked token at or above `mcap_floor`, ordered by market cap
    /// descending, for the startup recovery pass (§4.7).
    pub fn tokens_by_mcap_desc(&self, mcap_floor: f64) -> Result<Vec<Token>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT mint FROM tokens WHERE latest_market_cap_usd >= ?1 ORDER BY latest_market_cap_usd DESC",
        )?;
        let mints: Vec<String> = stmt
            .query_map(params![mcap_floor], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;
        drop(stmt);
        drop(conn);

        let mut tokens = Vec::with_capacity(mints.len());
        for mint in mints {
            if let Some(token) = self.token_by_mint(&mint)? {
                tokens.push(token);
            }
        }
        Ok(tokens)
    }

    pub fn set_stale_flag(&self, mint: &str, is_stale: bool) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("UPDATE tokens SET is_stale = ?1 WHERE mint = ?2", params![is_stale, mint])?;
        Ok(())
    }

    pub fn record_stale_detection_run(
        &self,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        tokens_scanned: u32,
        tokens_marked_stale: u32,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO stale_detection_runs (started_at, ended_at, tokens_scanned, tokens_marked_stale)
             VALUES (?1,?2,?3,?4)",
            params![started_at.to_rfc3339(), ended_at.to_rfc3339(), tokens_scanned, tokens_marked_stale],
        )?;
        Ok(())
    }

    /// Upserts a recovery batch's progress row, keyed by `batch_id` so a
    /// running batch's row is updated in place rather than duplicated
    /// (§4.7 "persists the final batch log").
    pub fn upsert_recovery_batch(&self, log: &RecoveryBatchLog) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO recovery_batch_log (
                batch_id, started_at, ended_at, tokens_checked, tokens_recovered,
                tokens_failed, external_queries, duration_ms, status
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)
            ON CONFLICT(batch_id) DO UPDATE SET
                ended_at = excluded.ended_at,
                tokens_checked = excluded.tokens_checked,
                tokens_recovered = excluded.tokens_recovered,
                tokens_failed = excluded.tokens_failed,
                external_queries = excluded.external_queries,
                duration_ms = excluded.duration_ms,
                status = excluded.status",
            params![
                log.batch_id,
                log.started_at.to_rfc3339(),
                log.ended_at.map(|t| t.to_rfc3339()),
                log.tokens_checked,
                log.tokens_recovered,
                log.tokens_failed,
                log.external_queries,
                log.duration_ms as i64,
                status_as_str(log.status),
            ],
        )?;
        Ok(())
    }

    /// Most recently started recovery batch, used by the startup pass to
    /// decide whether the gap since last activity warrants a catch-up scan.
    pub fn latest_recovery_batch(&self) -> Result<Option<RecoveryBatchLog>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT batch_id, started_at, ended_at, tokens_checked, tokens_recovered,
                    tokens_failed, external_queries, duration_ms, status
             FROM recovery_batch_log ORDER BY started_at DESC LIMIT 1",
            [],
            |row| {
                let status_str: String = row.get(8)?;
                Ok(RecoveryBatchLog {
                    batch_id: row.get(0)?,
                    started_at: row.get::<_, String>(1)?.parse().unwrap_or_else(|_| Utc::now()),
                    ended_at: row.get::<_, Option<String>>(2)?.and_then(|s| s.parse().ok()),
                    tokens_checked: row.get(3)?,
                    tokens_recovered: row.get(4)?,
                    tokens_failed: row.get(5)?,
                    external_queries: row.get(6)?,
                    duration_ms: row.get::<_, i64>(7)? as u64,
                    status: status_from_str(&status_str),
                })
            },
        )
        .optional()
        .map_err(anyhow::Error::from)
    }

    /// Upserts the per-mint recovery progress row after a recovery attempt,
    /// success or failure (§3 "Recovery-queue item", §4.7). `last_success_at`
    /// and `last_source` are only overwritten on a successful attempt so a
    /// failing streak doesn't erase the last time/source that actually
    /// worked.
    pub fn upsert_recovery_progress(&self, progress: &RecoveryProgress) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO recovery_progress (
                mint, last_attempt_at, last_success_at, consecutive_failures, last_source
            ) VALUES (?1,?2,?3,?4,?5)
            ON CONFLICT(mint) DO UPDATE SET
                last_attempt_at = excluded.last_attempt_at,
                last_success_at = COALESCE(excluded.last_success_at, recovery_progress.last_success_at),
                consecutive_failures = excluded.consecutive_failures,
                last_source = COALESCE(excluded.last_source, recovery_progress.last_source)",
            params![
                progress.mint,
                progress.last_attempt_at.to_rfc3339(),
                progress.last_success_at.map(|t| t.to_rfc3339()),
                progress.consecutive_failures,
                progress.last_source,
            ],
        )?;
        Ok(())
    }

    /// Per-mint recovery progress row, if one has ever been recorded.
    pub fn recovery_progress_by_mint(&self, mint: &str) -> Result<Option<RecoveryProgress>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT mint, last_attempt_at, last_success_at, consecutive_failures, last_source
             FROM recovery_progress WHERE mint = ?1",
            params![mint],
            |row| {
                Ok(RecoveryProgress {
                    mint: row.get(0)?,
                    last_attempt_at: row.get::<_, String>(1)?.parse().unwrap_or_else(|_| Utc::now()),
                    last_success_at: row.get::<_, Option<String>>(2)?.and_then(|s| s.parse().ok()),
                    consecutive_failures: row.get(3)?,
                    last_source: row.get(4)?,
                })
            },
        )
        .optional()
        .map_err(anyhow::Error::from)
    }

    /// Latest snapshot row for `mint`, used by the pool-state price adapter
    /// (§4.8 adapter 1).
    pub fn latest_pool_snapshot(&self, mint: &str) -> Result<Option<PoolStateSnapshot>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT pool_address, mint, virtual_sol_reserves, virtual_token_reserves,
                    real_sol_reserves, real_token_reserves, pool_open, timestamp, slot
             FROM pool_state_snapshots WHERE mint = ?1 ORDER BY slot DESC LIMIT 1",
            params![mint],
            |row| {
                Ok(PoolStateSnapshot {
                    pool_address: row.get(0)?,
                    mint: row.get(1)?,
                    virtual_sol_reserves: row.get::<_, i64>(2)? as u64,
                    virtual_token_reserves: row.get::<_, i64>(3)? as u64,
                    real_sol_reserves: row.get::<_, i64>(4)? as u64,
                    real_token_reserves: row.get::<_, i64>(5)? as u64,
                    pool_open: row.get(6)?,
                    timestamp: row.get::<_, String>(7)?.parse().unwrap_or_else(|_| Utc::now()),
                    slot: row.get::<_, i64>(8)? as u64,
                })
            },
        )
        .optional()
        .map_err(anyhow::Error::from)
    }

    pub fn insert_downtime_period(&self, period: &DowntimePeriod) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO downtime_periods (program, started_at, ended_at, last_slot_before, reason)
             VALUES (?1,?2,?3,?4,?5)",
            params![
                period.program.as_str(),
                period.started_at.to_rfc3339(),
                period.ended_at.map(|t| t.to_rfc3339()),
                period.last_slot_before.map(|v| v as i64),
                period.reason,
            ],
        )?;
        Ok(())
    }

    pub fn insert_performance_metric(&self, metric_name: &str, value: f64, recorded_at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO performance_metrics (metric_name, value, recorded_at) VALUES (?1,?2,?3)",
            params![metric_name, value, recorded_at.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Upserts an alert keyed by its id (§4.9 "creating an already-active
    /// alert updates its value and timestamp").
    pub fn upsert_performance_alert(&self, alert: &PerformanceAlert) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO performance_alerts (
                id, alert_type, severity, metric_name, value, threshold, message,
                timestamp, resolved, resolved_at
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)
            ON CONFLICT(id) DO UPDATE SET
                value = excluded.value,
                timestamp = excluded.timestamp,
                resolved = excluded.resolved,
                resolved_at = excluded.resolved_at",
            params![
                alert.id,
                alert_type_as_str(alert.alert_type),
                severity_as_str(alert.severity),
                alert.metric_name,
                alert.value,
                alert.threshold,
                alert.message,
                alert.timestamp.to_rfc3339(),
                alert.resolved,
                alert.resolved_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    pub fn active_alerts(&self) -> Result<Vec<PerformanceAlert>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, alert_type, severity, metric_name, value, threshold, message,
                    timestamp, resolved, resolved_at
             FROM performance_alerts WHERE resolved = 0",
        )?;
        let rows = stmt.query_map([], |row| {
            let alert_type: String = row.get(1)?;
            let severity: String = row.get(2)?;
            Ok(PerformanceAlert {
                id: row.get(0)?,
                alert_type: alert_type_from_str(&alert_type),
                severity: severity_from_str(&severity),
                metric_name: row.get(3)?,
                value: row.get(4)?,
                threshold: row.get(5)?,
                message: row.get(6)?,
                timestamp: row.get::<_, String>(7)?.parse().unwrap_or_else(|_| Utc::now()),
                resolved: row.get(8)?,
                resolved_at: row.get::<_, Option<String>>(9)?.and_then(|s| s.parse().ok()),
            })
        })?;
        rows.collect::<rusqlite::Result<_>>().map_err(anyhow::Error::from)
    }

    /// Upserts the cached SOL/USD rate (§6: "cached in a local table").
    /// Single-row table: id is always 1.
    pub fn upsert_sol_price(&self, price_usd: f64, observed_at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO sol_price_cache (id, price_usd, observed_at) VALUES (1, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET price_usd = excluded.price_usd, observed_at = excluded.observed_at",
            params![price_usd, observed_at.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Reads the last cached SOL/USD rate, used to seed [`crate::trade_handler::SharedSolPrice`]
    /// on startup before the first live refresh completes.
    pub fn latest_sol_price(&self) -> Result<Option<f64>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT price_usd FROM sol_price_cache WHERE id = 1", [], |row| row.get(0))
            .optional()
            .map_err(anyhow::Error::from)
    }
}

fn status_as_str(status: BatchStatus) -> &'static str {
    match status {
        BatchStatus::Running => "running",
        BatchStatus::Completed => "completed",
        BatchStatus::Cancelled => "cancelled",
        BatchStatus::Failed => "failed",
    }
}

fn status_from_str(value: &str) -> BatchStatus {
    match value {
        "completed" => BatchStatus::Completed,
        "cancelled" => BatchStatus::Cancelled,
        "failed" => BatchStatus::Failed,
        _ => BatchStatus::Running,
    }
}

fn alert_type_as_str(alert_type: AlertType) -> &'static str {
    match alert_type {
        AlertType::ParseLatency => "parse_latency",
        AlertType::StreamLag => "stream_lag",
        AlertType::MissedTxRate => "missed_tx_rate",
        AlertType::Memory => "memory",
        AlertType::Cpu => "cpu",
        AlertType::QueueDepth => "queue_depth",
    }
}

fn alert_type_from_str(value: &str) -> AlertType {
    match value {
        "stream_lag" => AlertType::StreamLag,
        "missed_tx_rate" => AlertType::MissedTxRate,
        "memory" => AlertType::Memory,
        "cpu" => AlertType::Cpu,
        "queue_depth" => AlertType::QueueDepth,
        _ => AlertType::ParseLatency,
    }
}

fn severity_as_str(severity: AlertSeverity) -> &'static str {
    match severity {
        AlertSeverity::Low => "low",
        AlertSeverity::Medium => "medium",
        AlertSeverity::High => "high",
        AlertSeverity::Critical => "critical",
    }
}

fn severity_from_str(value: &str) -> AlertSeverity {
    match value {
        "medium" => AlertSeverity::Medium,
        "high" => AlertSeverity::High,
        "critical" => AlertSeverity::Critical,
        _ => AlertSeverity::Low,
    }
}

pub(crate) fn parse_rfc3339(value: String) -> Result<chrono::DateTime<chrono::Utc>> {
    Ok(chrono::DateTime::parse_from_rfc3339(&value)?.with_timezone(&chrono::Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ensure_test_config;
    use crate::domain::TradeSide;

    fn sample_trade(signature: &str, mint: &str) -> Trade {
        Trade {
            signature: signature.to_string(),
            mint: mint.to_string(),
            program: Program::BondingCurve,
            side: TradeSide::Buy,
            user: Some("buyer".to_string()),
            sol_amount: 1_000_000_000,
            token_amount: 5_000_000,
            price_sol: 0.0002,
            price_usd: 0.02,
            market_cap_usd: 20_000.0,
            virtual_sol_reserves: 30_000_000_000,
            virtual_token_reserves: 1_000_000_000_000,
            bonding_curve_progress: 12.5,
            slot: 1000,
            block_time: Utc::now(),
            price_impact_pct: None,
            slippage_pct: None,
            spot_price_sol: None,
            execution_price_sol: None,
            min_received: None,
            max_received: None,
        }
    }

    #[test]
    fn insert_batch_creates_placeholder_token_for_unknown_mint() {
        ensure_test_config();
        let store = PersistenceStore::in_memory().unwrap();
        let trade = sample_trade("sig-1", "mint-a");

        let inserted = store.insert_batch(&[PendingRow::Trade(trade)]).unwrap();
        assert_eq!(inserted, 1);

        let token = store.token_by_mint("mint-a").unwrap().expect("placeholder token");
        assert_eq!(token.mint, "mint-a");
        assert_eq!(token.program, Program::BondingCurve);
        assert!(!token.graduated);
    }

    #[test]
    fn insert_batch_is_idempotent_on_duplicate_signature() {
        ensure_test_config();
        let store = PersistenceStore::in_memory().unwrap();
        let trade = sample_trade("sig-dup", "mint-b");

        store.insert_batch(&[PendingRow::Trade(trade.clone())]).unwrap();
        // A redelivered batch with the same signature must not error or
        // duplicate the row (§7 "at-least-once with idempotent sinks").
        let second = store.insert_batch(&[PendingRow::Trade(trade)]).unwrap();
        assert_eq!(second, 1, "DO NOTHING conflicts still count as handled");

        let count: i64 = store
            .conn
            .lock()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM trades WHERE signature = 'sig-dup'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn sol_price_round_trips_through_cache_table() {
        let store = PersistenceStore::in_memory().unwrap();
        assert_eq!(store.latest_sol_price().unwrap(), None);

        store.upsert_sol_price(182.5, Utc::now()).unwrap();
        assert_eq!(store.latest_sol_price().unwrap(), Some(182.5));

        // Refreshing replaces the single cached row rather than appending.
        store.upsert_sol_price(190.0, Utc::now()).unwrap();
        assert_eq!(store.latest_sol_price().unwrap(), Some(190.0));

        let count: i64 = store
            .conn
            .lock()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM sol_price_cache", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
