use crate::domain::{LiquidityEvent, LiquidityKind};
use crate::parser::{ParseContext, ParsedEvent, ParseStrategy};
use async_trait::async_trait;

/// Matches liquidity deposits/withdrawals on the AMM program. The two kinds
/// are distinguished by which LP-token field is present in the logs, not by
/// probing the payload shape (§9 design note).
pub struct LiquidityStrategy {
    program_id: String,
}

impl LiquidityStrategy {
    pub fn new(program_id: String) -> Self {
        Self { program_id }
    }
}

#[async_trait]
impl ParseStrategy for LiquidityStrategy {
    fn name(&self) -> &'static str {
        "liquidity"
    }

    fn can_parse(&self, ctx: &ParseContext) -> bool {
        ctx.contains_program(&self.program_id) && ctx.logs_contain_any(&["lpTokenAmountOut", "lpTokenAmountIn"])
    }

    async fn parse(&self, ctx: &ParseContext) -> Result<Option<ParsedEvent>, String> {
        let kind = if ctx.logs_contain("lpTokenAmountOut") {
            LiquidityKind::Deposit
        } else {
            LiquidityKind::Withdraw
        };

        let lp_field = match kind {
            LiquidityKind::Deposit => "lpTokenAmountOut",
            LiquidityKind::Withdraw => "lpTokenAmountIn",
        };

        let lp_amount = ctx
            .scrape_log_field(lp_field)
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or_else(|| "liquidity: missing lp token amount".to_string())?;

        let pool_address = ctx
            .scrape_log_field("pool")
            .ok_or_else(|| "liquidity: missing pool address".to_string())?;
        let mint = ctx.scrape_log_field("mint").ok_or_else(|| "liquidity: missing mint".to_string())?;
        let user = ctx.scrape_log_field("user");
        let sol_amount = ctx.scrape_log_field("solAmount").and_then(|s| s.parse::<u64>().ok()).unwrap_or(0);
        let token_amount = ctx.scrape_log_field("tokenAmount").and_then(|s| s.parse::<u64>().ok()).unwrap_or(0);
        let sol_reserves_after =
            ctx.scrape_log_field("solReservesAfter").and_then(|s| s.parse::<u64>().ok()).unwrap_or(0);
        let token_reserves_after =
            ctx.scrape_log_field("tokenReservesAfter").and_then(|s| s.parse::<u64>().ok()).unwrap_or(0);

        let event = LiquidityEvent {
            signature: ctx.signature.clone(),
            kind,
            pool_address,
            mint,
            user,
            lp_amount,
            sol_amount,
            token_amount,
            sol_reserves_after,
            token_reserves_after,
            value_usd: 0.0,
            slot: ctx.slot,
            block_time: ctx.block_time,
        };

        Ok(Some(ParsedEvent::Liquidity(event)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn deposit_is_distinguished_from_withdraw() {
        let strategy = LiquidityStrategy::new("AMM11111111111111111111111111111111111111".to_string());
        let ctx = ParseContext {
            signature: "sig".to_string(),
            slot: 1,
            block_time: Utc::now(),
            accounts: vec![],
            program_ids: vec!["AMM11111111111111111111111111111111111111".to_string()],
            logs: vec![
                "Program log: lpTokenAmountOut: 12345".to_string(),
                "Program log: pool: Pool111111111111111111111111111111111111111".to_string(),
                "Program log: mint: Mint1111111111111111111111111111111111111".to_string(),
            ],
            instruction_data: None,
            raw_transaction: None,
        };
        assert!(strategy.can_parse(&ctx));
        let parsed = strategy.parse(&ctx).await.unwrap().unwrap();
        match parsed {
            ParsedEvent::Liquidity(event) => {
                assert_eq!(event.kind, LiquidityKind::Deposit);
                assert_eq!(event.lp_amount, 12345);
            }
            _ => panic!("wrong event variant"),
        }
    }
}
