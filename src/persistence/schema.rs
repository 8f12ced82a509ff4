use rusqlite::Connection;

/// Creates every table the pipeline writes to (§3, §6), plus the indexes
/// the hot read paths (stale scan, recovery priority scan) rely on.
/// `CREATE TABLE IF NOT EXISTS` throughout: safe to call on every startup.
pub fn initialize(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS tokens (
            mint TEXT PRIMARY KEY,
            symbol TEXT NOT NULL DEFAULT '',
            name TEXT NOT NULL DEFAULT '',
            uri TEXT,
            program TEXT NOT NULL,
            first_seen_slot INTEGER NOT NULL,
            first_seen_time TEXT NOT NULL,
            latest_price_sol REAL NOT NULL DEFAULT 0,
            latest_price_usd REAL NOT NULL DEFAULT 0,
            latest_market_cap_usd REAL NOT NULL DEFAULT 0,
            bonding_curve_progress REAL NOT NULL DEFAULT 0,
            bonding_curve_complete INTEGER NOT NULL DEFAULT 0,
            graduated INTEGER NOT NULL DEFAULT 0,
            graduation_slot INTEGER,
            graduation_signature TEXT,
            creator TEXT,
            decimals INTEGER NOT NULL DEFAULT 6,
            total_supply INTEGER NOT NULL,
            enriched INTEGER NOT NULL DEFAULT 0,
            last_trade_time TEXT,
            last_price_update_time TEXT,
            price_source TEXT,
            is_stale INTEGER NOT NULL DEFAULT 0,
            should_remove INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS trades (
            signature TEXT PRIMARY KEY,
            mint TEXT NOT NULL,
            program TEXT NOT NULL,
            side TEXT NOT NULL,
            user TEXT,
            sol_amount INTEGER NOT NULL,
            token_amount INTEGER NOT NULL,
            price_sol REAL NOT NULL,
            price_usd REAL NOT NULL,
            market_cap_usd REAL NOT NULL,
            virtual_sol_reserves INTEGER NOT NULL,
            virtual_token_reserves INTEGER NOT NULL,
            bonding_curve_progress REAL NOT NULL,
            slot INTEGER NOT NULL,
            block_time TEXT NOT NULL,
            price_impact_pct REAL,
            slippage_pct REAL,
            spot_price_sol REAL,
            execution_price_sol REAL,
            min_received INTEGER,
            max_received INTEGER
        );

        CREATE TABLE IF NOT EXISTS pool_state_snapshots (
            pool_address TEXT NOT NULL,
            slot INTEGER NOT NULL,
            mint TEXT NOT NULL,
            virtual_sol_reserves INTEGER NOT NULL,
            virtual_token_reserves INTEGER NOT NULL,
            real_sol_reserves INTEGER NOT NULL,
            real_token_reserves INTEGER NOT NULL,
            pool_open INTEGER NOT NULL,
            timestamp TEXT NOT NULL,
            PRIMARY KEY (pool_address, slot)
        );

        CREATE TABLE IF NOT EXISTS liquidity_events (
            signature TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            pool_address TEXT NOT NULL,
            mint TEXT NOT NULL,
            user TEXT,
            lp_amount INTEGER NOT NULL,
            sol_amount INTEGER NOT NULL,
            token_amount INTEGER NOT NULL,
            sol_reserves_after INTEGER NOT NULL,
            token_reserves_after INTEGER NOT NULL,
            value_usd REAL NOT NULL,
            slot INTEGER NOT NULL,
            block_time TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS fee_events (
            signature TEXT NOT NULL,
            event_type TEXT NOT NULL,
            pool_address TEXT NOT NULL,
            mint TEXT NOT NULL,
            recipient TEXT,
            sol_fee_amount INTEGER NOT NULL,
            token_fee_amount INTEGER NOT NULL,
            sol_reserves_after INTEGER NOT NULL,
            token_reserves_after INTEGER NOT NULL,
            slot INTEGER NOT NULL,
            block_time TEXT NOT NULL,
            PRIMARY KEY (signature, event_type)
        );

        CREATE TABLE IF NOT EXISTS stale_detection_runs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            started_at TEXT NOT NULL,
            ended_at TEXT,
            tokens_scanned INTEGER NOT NULL DEFAULT 0,
            tokens_marked_stale INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS recovery_batch_log (
            batch_id TEXT PRIMARY KEY,
            started_at TEXT NOT NULL,
            ended_at TEXT,
            tokens_checked INTEGER NOT NULL DEFAULT 0,
            tokens_recovered INTEGER NOT NULL DEFAULT 0,
            tokens_failed INTEGER NOT NULL DEFAULT 0,
            external_queries INTEGER NOT NULL DEFAULT 0,
            duration_ms INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS recovery_progress (
            mint TEXT PRIMARY KEY,
            last_attempt_at TEXT NOT NULL,
            last_success_at TEXT,
            consecutive_failures INTEGER NOT NULL DEFAULT 0,
            last_source TEXT
        );

        CREATE TABLE IF NOT EXISTS downtime_periods (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            program TEXT NOT NULL,
            started_at TEXT NOT NULL,
            ended_at TEXT,
            last_slot_before INTEGER,
            reason TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS performance_metrics (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            metric_name TEXT NOT NULL,
            value REAL NOT NULL,
            recorded_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS performance_alerts (
            id TEXT PRIMARY KEY,
            alert_type TEXT NOT NULL,
            severity TEXT NOT NULL,
            metric_name TEXT NOT NULL,
            value REAL NOT NULL,
            threshold REAL NOT NULL,
            message TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            resolved INTEGER NOT NULL DEFAULT 0,
            resolved_at TEXT
        );

        CREATE TABLE IF NOT EXISTS sol_price_cache (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            price_usd REAL NOT NULL,
            observed_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_trades_mint ON trades(mint);
        CREATE INDEX IF NOT EXISTS idx_trades_block_time ON trades(block_time);
        CREATE INDEX IF NOT EXISTS idx_tokens_market_cap ON tokens(latest_market_cap_usd);
        CREATE INDEX IF NOT EXISTS idx_tokens_is_stale ON tokens(is_stale);
        CREATE INDEX IF NOT EXISTS idx_pool_state_mint ON pool_state_snapshots(mint);
        ",
    )
}
