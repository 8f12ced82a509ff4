use crate::domain::{Program, Trade, TradeSide};
use crate::parser::{ParseContext, ParsedEvent, ParseStrategy};
use async_trait::async_trait;

/// Matches swaps on the AMM program (§4.2). Direction is resolved from the
/// input mint: if it is wrapped SOL, the trade is a buy of the other mint,
/// otherwise a sell.
pub struct AmmTradeStrategy {
    program_id: String,
    wrapped_sol_mint: String,
}

impl AmmTradeStrategy {
    pub fn new(program_id: String, wrapped_sol_mint: String) -> Self {
        Self { program_id, wrapped_sol_mint }
    }
}

#[async_trait]
impl ParseStrategy for AmmTradeStrategy {
    fn name(&self) -> &'static str {
        "amm_trade"
    }

    fn can_parse(&self, ctx: &ParseContext) -> bool {
        ctx.contains_program(&self.program_id) && ctx.logs_contain_any(&["Instruction: Swap", "Instruction: swap"])
    }

    async fn parse(&self, ctx: &ParseContext) -> Result<Option<ParsedEvent>, String> {
        let input_mint = ctx.scrape_log_field("inputMint").or_else(|| ctx.scrape_log_field("input_mint"));
        let output_mint = ctx.scrape_log_field("outputMint").or_else(|| ctx.scrape_log_field("output_mint"));
        let amount_in = ctx
            .scrape_log_field("amountIn")
            .or_else(|| ctx.scrape_log_field("amount_in"))
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);
        let amount_out = ctx
            .scrape_log_field("amountOut")
            .or_else(|| ctx.scrape_log_field("amount_out"))
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);
        let mut pool_sol_reserves = ctx
            .scrape_log_field("poolSolReserves")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);
        let mut pool_token_reserves = ctx
            .scrape_log_field("poolTokenReserves")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);
        if pool_sol_reserves == 0 || pool_token_reserves == 0 {
            if let Some(ray_log) = ctx.decode_ray_log_swap() {
                pool_sol_reserves = ray_log.pool_pc_reserves;
                pool_token_reserves = ray_log.pool_coin_reserves;
            }
        }
        let user = ctx.scrape_log_field("user");

        let (mint, side, sol_amount, token_amount) = match (input_mint.as_deref(), output_mint.as_deref()) {
            (Some(input), Some(output)) if input == self.wrapped_sol_mint => {
                (output.to_string(), TradeSide::Buy, amount_in, amount_out)
            }
            (Some(input), Some(output)) if output == self.wrapped_sol_mint => {
                (input.to_string(), TradeSide::Sell, amount_out, amount_in)
            }
            (Some(input), Some(output)) => {
                if ctx.logs_contain_any(&["Instruction: Sell", "direction: sell"]) {
                    (input.to_string(), TradeSide::Sell, amount_out, amount_in)
                } else {
                    (output.to_string(), TradeSide::Buy, amount_in, amount_out)
                }
            }
            _ => return Err("amm trade: missing input/output mint".to_string()),
        };

        let trade = Trade {
            signature: ctx.signature.clone(),
            mint,
            program: Program::AmmPool,
            side,
            user,
            sol_amount,
            token_amount,
            price_sol: 0.0,
            price_usd: 0.0,
            market_cap_usd: 0.0,
            virtual_sol_reserves: pool_sol_reserves,
            virtual_token_reserves: pool_token_reserves,
            bonding_curve_progress: 100.0,
            slot: ctx.slot,
            block_time: ctx.block_time,
            price_impact_pct: None,
            slippage_pct: None,
            spot_price_sol: None,
            execution_price_sol: None,
            min_received: None,
            max_received: None,
        };

        Ok(Some(ParsedEvent::AmmTrade(trade)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ctx(logs: Vec<&str>) -> ParseContext {
        ParseContext {
            signature: "sig".to_string(),
            slot: 1,
            block_time: Utc::now(),
            accounts: vec![],
            program_ids: vec!["AMM11111111111111111111111111111111111111".to_string()],
            logs: logs.into_iter().map(str::to_string).collect(),
            instruction_data: None,
            raw_transaction: None,
        }
    }

    fn encode_ray_log(pool_coin: u64, pool_pc: u64, out_amount: u64) -> String {
        use base64::{engine::general_purpose, Engine as _};
        let mut bytes = vec![3u8]; // swap-entry type tag
        bytes.extend_from_slice(&0u64.to_le_bytes());
        bytes.extend_from_slice(&0u64.to_le_bytes());
        bytes.extend_from_slice(&0u64.to_le_bytes());
        bytes.extend_from_slice(&0u64.to_le_bytes());
        bytes.extend_from_slice(&pool_coin.to_le_bytes());
        bytes.extend_from_slice(&pool_pc.to_le_bytes());
        bytes.extend_from_slice(&out_amount.to_le_bytes());
        general_purpose::STANDARD.encode(bytes)
    }

    #[tokio::test]
    async fn buy_with_ray_log_reserves_falls_back_to_base64_decode() {
        let strategy = AmmTradeStrategy::new(
            "AMM11111111111111111111111111111111111111".to_string(),
            "So11111111111111111111111111111111111111112".to_string(),
        );
        let ray_log = encode_ray_log(500_000_000_000_000, 100_000_000_000, 10_000_000_000);
        let context = ctx(vec![
            "Program log: Instruction: Swap",
            "Program log: inputMint: So11111111111111111111111111111111111111112",
            "Program log: amountIn: 2000000000",
            "Program log: outputMint: Mint2",
            "Program log: amountOut: 10000000000",
        ]);
        let mut context = context;
        context.logs.push(format!("Program log: ray_log: {ray_log}"));

        let parsed = strategy.parse(&context).await.unwrap().unwrap();
        match parsed {
            ParsedEvent::AmmTrade(trade) => {
                assert_eq!(trade.side, TradeSide::Buy);
                assert_eq!(trade.mint, "Mint2");
                assert_eq!(trade.sol_amount, 2_000_000_000);
                assert_eq!(trade.token_amount, 10_000_000_000);
                assert_eq!(trade.virtual_sol_reserves, 100_000_000_000);
                assert_eq!(trade.virtual_token_reserves, 500_000_000_000_000);
            }
            _ => panic!("wrong event variant"),
        }
    }

    #[tokio::test]
    async fn buy_when_input_is_wrapped_sol() {
        let strategy = AmmTradeStrategy::new(
            "AMM11111111111111111111111111111111111111".to_string(),
            "So11111111111111111111111111111111111111112".to_string(),
        );
        let context = ctx(vec![
            "Program log: Instruction: Swap",
            "Program log: inputMint: So11111111111111111111111111111111111111112",
            "Program log: outputMint: Mint1111111111111111111111111111111111111",
            "Program log: amountIn: 1000000000",
            "Program log: amountOut: 5000000",
        ]);
        assert!(strategy.can_parse(&context));
        let parsed = strategy.parse(&context).await.unwrap().unwrap();
        match parsed {
            ParsedEvent::AmmTrade(trade) => {
                assert_eq!(trade.side, TradeSide::Buy);
                assert_eq!(trade.sol_amount, 1_000_000_000);
                assert_eq!(trade.token_amount, 5_000_000);
            }
            _ => panic!("wrong event variant"),
        }
    }
}
