use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};

/// Reserves recovered from a decoded `ray_log` swap payload (§4.2, §8
/// scenario 4). Raydium-style AMM programs emit this as a single base64
/// blob instead of plain `key=value` log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RayLogSwap {
    pub pool_coin_reserves: u64,
    pub pool_pc_reserves: u64,
    pub amount_out: u64,
}

/// Byte layout of a Raydium `ray_log` swap-direction-2 (`SwapBaseIn`/
/// `SwapBaseOut`) entry: a 1-byte log type tag followed by seven
/// little-endian `u64` fields. Only the fields needed to recover pool
/// reserves and the realized output amount are named; the rest are
/// skipped by offset.
const LOG_TYPE_OFFSET: usize = 0;
const POOL_COIN_OFFSET: usize = 1 + 8 + 8 + 8 + 8;
const POOL_PC_OFFSET: usize = POOL_COIN_OFFSET + 8;
const OUT_AMOUNT_OFFSET: usize = POOL_PC_OFFSET + 8;
const RAY_LOG_MIN_LEN: usize = OUT_AMOUNT_OFFSET + 8;
const RAY_LOG_SWAP_TYPE: u8 = 3;

/// Everything a parse strategy needs to decide whether it matches a raw
/// transaction and, if so, extract an event from it (§4.2).
///
/// This is intentionally a read-only view: strategies never mutate the
/// context, only read from it. `instruction_data` and `raw_transaction` are
/// optional because the subscription manager may deliver a transaction with
/// only logs and accounts populated (log-scraping fallback path).
#[derive(Debug, Clone)]
pub struct ParseContext {
    pub signature: String,
    pub slot: u64,
    pub block_time: DateTime<Utc>,
    /// Base58-encoded account keys referenced by the transaction message.
    pub accounts: Vec<String>,
    /// Program ids present among `accounts` that the caller has already
    /// classified as bonding-curve or AMM (§4.2 "program id ... present").
    pub program_ids: Vec<String>,
    pub logs: Vec<String>,
    pub instruction_data: Option<Vec<u8>>,
    pub raw_transaction: Option<Vec<u8>>,
}

impl ParseContext {
    pub fn contains_program(&self, program_id: &str) -> bool {
        self.program_ids.iter().any(|p| p == program_id)
    }

    pub fn logs_contain(&self, needle: &str) -> bool {
        self.logs.iter().any(|l| l.contains(needle))
    }

    pub fn logs_contain_any(&self, needles: &[&str]) -> bool {
        needles.iter().any(|n| self.logs_contain(n))
    }

    /// Best-effort mint extraction from log lines, used as the fallback path
    /// when instruction data is absent (§4.2 bonding-curve strategy).
    pub fn scrape_log_field(&self, key: &str) -> Option<String> {
        for line in &self.logs {
            if let Some(idx) = line.find(key) {
                let rest = &line[idx + key.len()..];
                let rest = rest.trim_start_matches([':', '=', ' ']);
                let value: String = rest
                    .chars()
                    .take_while(|c| !c.is_whitespace() && *c != ',' && *c != '"')
                    .collect();
                if !value.is_empty() {
                    return Some(value);
                }
            }
        }
        None
    }

    /// Finds a `ray_log: <base64>` line and decodes it into pool reserves
    /// and the realized output amount. Returns `None` when no such line is
    /// present, the payload isn't valid base64, it's too short, or its type
    /// tag isn't a swap entry (§4.2, §8 scenario 4).
    pub fn decode_ray_log_swap(&self) -> Option<RayLogSwap> {
        for line in &self.logs {
            let Some(idx) = line.find("ray_log") else { continue };
            let rest = line[idx + "ray_log".len()..].trim_start_matches([':', '=', ' ']);
            let payload: String = rest.chars().take_while(|c| !c.is_whitespace()).collect();
            if payload.is_empty() {
                continue;
            }

            let Ok(bytes) = general_purpose::STANDARD.decode(&payload) else { continue };
            if bytes.len() < RAY_LOG_MIN_LEN || bytes[LOG_TYPE_OFFSET] != RAY_LOG_SWAP_TYPE {
                continue;
            }

            let read_u64 = |offset: usize| -> u64 {
                u64::from_le_bytes(bytes[offset..offset + 8].try_into().expect("checked by RAY_LOG_MIN_LEN"))
            };

            return Some(RayLogSwap {
                pool_coin_reserves: read_u64(POOL_COIN_OFFSET),
                pool_pc_reserves: read_u64(POOL_PC_OFFSET),
                amount_out: read_u64(OUT_AMOUNT_OFFSET),
            });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_ray_log(pool_coin: u64, pool_pc: u64, out_amount: u64) -> String {
        let mut bytes = vec![RAY_LOG_SWAP_TYPE];
        bytes.extend_from_slice(&0u64.to_le_bytes()); // amount_in
        bytes.extend_from_slice(&0u64.to_le_bytes()); // minimum_out
        bytes.extend_from_slice(&0u64.to_le_bytes()); // direction
        bytes.extend_from_slice(&0u64.to_le_bytes()); // user_source
        bytes.extend_from_slice(&pool_coin.to_le_bytes());
        bytes.extend_from_slice(&pool_pc.to_le_bytes());
        bytes.extend_from_slice(&out_amount.to_le_bytes());
        general_purpose::STANDARD.encode(bytes)
    }

    fn context(logs: Vec<String>) -> ParseContext {
        ParseContext {
            signature: "sig".to_string(),
            slot: 1,
            block_time: Utc::now(),
            accounts: vec![],
            program_ids: vec![],
            logs,
            instruction_data: None,
            raw_transaction: None,
        }
    }

    #[test]
    fn decodes_ray_log_swap_line() {
        let encoded = encode_ray_log(500_000_000_000_000, 100_000_000_000, 10_000_000_000);
        let ctx = context(vec![format!("Program log: ray_log: {encoded}")]);
        let swap = ctx.decode_ray_log_swap().expect("should decode");
        assert_eq!(swap.pool_pc_reserves, 100_000_000_000);
        assert_eq!(swap.amount_out, 10_000_000_000);
    }

    #[test]
    fn missing_ray_log_line_yields_none() {
        let ctx = context(vec!["Program log: Instruction: Swap".to_string()]);
        assert!(ctx.decode_ray_log_swap().is_none());
    }

    #[test]
    fn malformed_base64_is_ignored() {
        let ctx = context(vec!["Program log: ray_log: not-valid-base64!!".to_string()]);
        assert!(ctx.decode_ray_log_swap().is_none());
    }
}
