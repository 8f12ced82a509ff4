use crate::config::{ParserConfig, PriceConfig};
use crate::domain::{Program, Trade, TradeSide};
use crate::parser::{ParseContext, ParsedEvent, ParseStrategy};
use crate::pool_cache::PoolCache;
use async_trait::async_trait;
use std::sync::Arc;

/// Fixed prefix shared by both the short and full bonding-curve trade
/// instruction-data layouts (§4.2):
/// `discriminator(8) | mint(32) | sol_amount(u64) | token_amount(u64) |
/// user(32) | bonding_curve(32)`.
const PREFIX_LEN: usize = 8 + 32 + 8 + 8 + 32 + 32;
const DISCRIMINATOR_LEN: usize = 8;
const PUBKEY_LEN: usize = 32;

pub struct BondingCurveTradeStrategy {
    program_id: String,
    parser_config: ParserConfig,
    price_config: PriceConfig,
    pool_cache: Arc<PoolCache>,
}

impl BondingCurveTradeStrategy {
    pub fn new(
        program_id: String,
        parser_config: ParserConfig,
        price_config: PriceConfig,
        pool_cache: Arc<PoolCache>,
    ) -> Self {
        Self { program_id, parser_config, price_config, pool_cache }
    }

    fn decode_instruction_data(&self, data: &[u8]) -> Option<DecodedTrade> {
        // `bonding_curve_short_layout_len` is configurable so a future program
        // revision can require more than the fixed prefix before treating data
        // as decodable; it can never shrink below `PREFIX_LEN`, which is the
        // hard minimum this function needs to safely index the buffer.
        let min_len = self.parser_config.bonding_curve_short_layout_len.max(PREFIX_LEN);
        if data.len() < min_len {
            return None;
        }

        let mut offset = DISCRIMINATOR_LEN;
        let mint = bs58::encode(&data[offset..offset + PUBKEY_LEN]).into_string();
        offset += PUBKEY_LEN;

        let sol_amount = read_u64_le(data, offset)?;
        offset += 8;
        let token_amount = read_u64_le(data, offset)?;
        offset += 8;

        let user = bs58::encode(&data[offset..offset + PUBKEY_LEN]).into_string();
        offset += PUBKEY_LEN;

        let bonding_curve = bs58::encode(&data[offset..offset + PUBKEY_LEN]).into_string();

        // The full layout (>= bonding_curve_full_layout_len bytes) appends
        // virtual reserves; we read them from the tail of the buffer rather
        // than assuming a fixed middle section, since the bytes between the
        // prefix and the trailing reserves carry fields this strategy does
        // not need (fee metadata, creator vault, etc).
        let reserves = if data.len() >= self.parser_config.bonding_curve_full_layout_len {
            let tail = data.len();
            let virtual_sol_reserves = read_u64_le(data, tail - 16)?;
            let virtual_token_reserves = read_u64_le(data, tail - 8)?;
            Some((virtual_sol_reserves, virtual_token_reserves))
        } else {
            None
        };

        Some(DecodedTrade { mint, sol_amount, token_amount, user, bonding_curve, reserves })
    }
}

struct DecodedTrade {
    mint: String,
    sol_amount: u64,
    token_amount: u64,
    user: String,
    bonding_curve: String,
    reserves: Option<(u64, u64)>,
}

fn read_u64_le(data: &[u8], offset: usize) -> Option<u64> {
    data.get(offset..offset + 8).map(|b| u64::from_le_bytes(b.try_into().unwrap()))
}

#[async_trait]
impl ParseStrategy for BondingCurveTradeStrategy {
    fn name(&self) -> &'static str {
        "bonding_curve_trade"
    }

    fn can_parse(&self, ctx: &ParseContext) -> bool {
        ctx.contains_program(&self.program_id)
            && ctx.logs_contain_any(&["Instruction: Buy", "Instruction: Sell"])
    }

    async fn parse(&self, ctx: &ParseContext) -> Result<Option<ParsedEvent>, String> {
        let is_buy = ctx.logs_contain("Instruction: Buy");
        let side = if is_buy { TradeSide::Buy } else { TradeSide::Sell };

        let decoded = ctx.instruction_data.as_deref().and_then(|data| self.decode_instruction_data(data));

        let (mint, sol_amount, token_amount, user, bonding_curve, reserves) = match decoded {
            Some(d) => (d.mint, d.sol_amount, d.token_amount, Some(d.user), Some(d.bonding_curve), d.reserves),
            None => {
                // Data missing or too short: fall back to log-scraping for
                // the mint, amounts are left at zero (§4.2).
                let mint = ctx
                    .scrape_log_field("mint")
                    .or_else(|| ctx.scrape_log_field("mint:"))
                    .ok_or_else(|| "bonding curve trade: no mint in data or logs".to_string())?;
                (mint, 0, 0, None, None, None)
            }
        };

        let (virtual_sol_reserves, virtual_token_reserves) = match reserves {
            Some(r) => r,
            None => bonding_curve
                .as_deref()
                .and_then(|pool| self.pool_cache.get_by_pool(pool))
                .or_else(|| self.pool_cache.get(&mint))
                .map(|r| (r.virtual_sol_reserves, r.virtual_token_reserves))
                .unwrap_or((
                    self.price_config.default_virtual_sol_reserves,
                    self.price_config.default_virtual_token_reserves,
                )),
        };

        let trade = Trade {
            signature: ctx.signature.clone(),
            mint,
            program: Program::BondingCurve,
            side,
            user,
            sol_amount,
            token_amount,
            price_sol: 0.0,
            price_usd: 0.0,
            market_cap_usd: 0.0,
            virtual_sol_reserves,
            virtual_token_reserves,
            bonding_curve_progress: 0.0,
            slot: ctx.slot,
            block_time: ctx.block_time,
            price_impact_pct: None,
            slippage_pct: None,
            spot_price_sol: None,
            execution_price_sol: None,
            min_received: None,
            max_received: None,
        };

        Ok(Some(ParsedEvent::BondingCurveTrade(trade)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ParserConfig, PriceConfig};
    use chrono::Utc;

    fn build_data(sol_amount: u64, token_amount: u64, with_reserves: Option<(u64, u64)>) -> Vec<u8> {
        let mut data = vec![0u8; 8]; // discriminator
        data.extend_from_slice(&[1u8; 32]); // mint
        data.extend_from_slice(&sol_amount.to_le_bytes());
        data.extend_from_slice(&token_amount.to_le_bytes());
        data.extend_from_slice(&[2u8; 32]); // user
        data.extend_from_slice(&[3u8; 32]); // bonding curve
        if let Some((v_sol, v_tok)) = with_reserves {
            // pad so total length reaches the configured full-layout threshold
            let parser_cfg = ParserConfig::default();
            while data.len() < parser_cfg.bonding_curve_full_layout_len - 16 {
                data.push(0);
            }
            data.extend_from_slice(&v_sol.to_le_bytes());
            data.extend_from_slice(&v_tok.to_le_bytes());
        }
        data
    }

    #[tokio::test]
    async fn decodes_full_layout_with_reserves() {
        let pool_cache = Arc::new(PoolCache::new());
        let strategy = BondingCurveTradeStrategy::new(
            "BC11111111111111111111111111111111111111111".to_string(),
            ParserConfig::default(),
            PriceConfig::default(),
            pool_cache,
        );

        let data = build_data(1_000_000_000, 10_000_000, Some((30_500_000_000, 1_050_000_000_000_000)));
        let ctx = ParseContext {
            signature: "sig1".to_string(),
            slot: 200_000_000,
            block_time: Utc::now(),
            accounts: vec![],
            program_ids: vec!["BC11111111111111111111111111111111111111111".to_string()],
            logs: vec!["Program log: Instruction: Buy".to_string()],
            instruction_data: Some(data),
            raw_transaction: None,
        };

        assert!(strategy.can_parse(&ctx));
        let parsed = strategy.parse(&ctx).await.unwrap().unwrap();
        match parsed {
            ParsedEvent::BondingCurveTrade(trade) => {
                assert_eq!(trade.sol_amount, 1_000_000_000);
                assert_eq!(trade.token_amount, 10_000_000);
                assert_eq!(trade.virtual_sol_reserves, 30_500_000_000);
                assert_eq!(trade.virtual_token_reserves, 1_050_000_000_000_000);
                assert_eq!(trade.side, TradeSide::Buy);
            }
            _ => panic!("wrong event variant"),
        }
    }

    #[tokio::test]
    async fn short_layout_falls_back_to_pool_cache() {
        let pool_cache = Arc::new(PoolCache::new());
        let mint = bs58::encode([1u8; 32]).into_string();
        pool_cache.update(&mint, None, 25_000_000_000, 900_000_000_000_000, 0, 0, 100);

        let strategy = BondingCurveTradeStrategy::new(
            "BC11111111111111111111111111111111111111111".to_string(),
            ParserConfig::default(),
            PriceConfig::default(),
            pool_cache,
        );

        let data = build_data(500_000_000, 5_000_000, None);
        let ctx = ParseContext {
            signature: "sig2".to_string(),
            slot: 101,
            block_time: Utc::now(),
            accounts: vec![],
            program_ids: vec!["BC11111111111111111111111111111111111111111".to_string()],
            logs: vec!["Program log: Instruction: Sell".to_string()],
            instruction_data: Some(data),
            raw_transaction: None,
        };

        let parsed = strategy.parse(&ctx).await.unwrap().unwrap();
        match parsed {
            ParsedEvent::BondingCurveTrade(trade) => {
                assert_eq!(trade.virtual_sol_reserves, 25_000_000_000);
                assert_eq!(trade.side, TradeSide::Sell);
            }
            _ => panic!("wrong event variant"),
        }
    }
}
