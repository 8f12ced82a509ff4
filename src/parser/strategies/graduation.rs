use crate::domain::{GraduationEvent, PoolCreatedEvent};
use crate::parser::{ParseContext, ParsedEvent, ParseStrategy};
use async_trait::async_trait;

/// Matches the two instructions that mark a mint's transition off the
/// bonding curve: the curve's final `withdraw` (graduation) and the AMM's
/// `create_pool` that follows it (§4.2). This runs before the trade
/// strategies since both instructions can appear alongside trade-shaped log
/// lines in the same transaction.
pub struct GraduationStrategy {
    bonding_curve_program_id: String,
}

impl GraduationStrategy {
    pub fn new(bonding_curve_program_id: String) -> Self {
        Self { bonding_curve_program_id }
    }
}

#[async_trait]
impl ParseStrategy for GraduationStrategy {
    fn name(&self) -> &'static str {
        "graduation"
    }

    fn can_parse(&self, ctx: &ParseContext) -> bool {
        ctx.logs_contain_any(&["Instruction: Withdraw", "Instruction: CreatePool", "Instruction: create_pool"])
    }

    async fn parse(&self, ctx: &ParseContext) -> Result<Option<ParsedEvent>, String> {
        if ctx.contains_program(&self.bonding_curve_program_id) && ctx.logs_contain("Instruction: Withdraw") {
            let mint = ctx.scrape_log_field("mint").ok_or_else(|| "graduation: missing mint".to_string())?;
            let bonding_curve_address = ctx
                .scrape_log_field("bondingCurve")
                .or_else(|| ctx.scrape_log_field("bonding_curve"))
                .ok_or_else(|| "graduation: missing bonding curve address".to_string())?;
            let final_sol_reserves =
                ctx.scrape_log_field("realSolReserves").and_then(|s| s.parse::<u64>().ok()).unwrap_or(0);
            let final_token_reserves =
                ctx.scrape_log_field("realTokenReserves").and_then(|s| s.parse::<u64>().ok()).unwrap_or(0);

            return Ok(Some(ParsedEvent::Graduation(GraduationEvent {
                signature: ctx.signature.clone(),
                mint,
                bonding_curve_address,
                final_sol_reserves,
                final_token_reserves,
                slot: ctx.slot,
                block_time: ctx.block_time,
            })));
        }

        if ctx.logs_contain_any(&["Instruction: CreatePool", "Instruction: create_pool"]) {
            let mint = ctx.scrape_log_field("mint").ok_or_else(|| "pool created: missing mint".to_string())?;
            let pool_address =
                ctx.scrape_log_field("pool").ok_or_else(|| "pool created: missing pool address".to_string())?;
            let initial_sol_reserves =
                ctx.scrape_log_field("initialSolReserves").and_then(|s| s.parse::<u64>().ok()).unwrap_or(0);
            let initial_token_reserves =
                ctx.scrape_log_field("initialTokenReserves").and_then(|s| s.parse::<u64>().ok()).unwrap_or(0);

            return Ok(Some(ParsedEvent::PoolCreated(PoolCreatedEvent {
                signature: ctx.signature.clone(),
                mint,
                pool_address,
                initial_sol_reserves,
                initial_token_reserves,
                slot: ctx.slot,
                block_time: ctx.block_time,
            })));
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn withdraw_on_curve_program_emits_graduation() {
        let strategy = GraduationStrategy::new("BC11111111111111111111111111111111111111111".to_string());
        let ctx = ParseContext {
            signature: "sig".to_string(),
            slot: 1,
            block_time: Utc::now(),
            accounts: vec![],
            program_ids: vec!["BC11111111111111111111111111111111111111111".to_string()],
            logs: vec![
                "Program log: Instruction: Withdraw".to_string(),
                "Program log: mint: Mint1111111111111111111111111111111111111".to_string(),
                "Program log: bondingCurve: Curve111111111111111111111111111111111111".to_string(),
            ],
            instruction_data: None,
            raw_transaction: None,
        };
        assert!(strategy.can_parse(&ctx));
        let parsed = strategy.parse(&ctx).await.unwrap().unwrap();
        assert!(matches!(parsed, ParsedEvent::Graduation(_)));
    }

    #[tokio::test]
    async fn create_pool_emits_pool_created() {
        let strategy = GraduationStrategy::new("BC11111111111111111111111111111111111111111".to_string());
        let ctx = ParseContext {
            signature: "sig2".to_string(),
            slot: 1,
            block_time: Utc::now(),
            accounts: vec![],
            program_ids: vec!["AMM11111111111111111111111111111111111111".to_string()],
            logs: vec![
                "Program log: Instruction: CreatePool".to_string(),
                "Program log: mint: Mint1111111111111111111111111111111111111".to_string(),
                "Program log: pool: Pool111111111111111111111111111111111111111".to_string(),
            ],
            instruction_data: None,
            raw_transaction: None,
        };
        let parsed = strategy.parse(&ctx).await.unwrap().unwrap();
        assert!(matches!(parsed, ParsedEvent::PoolCreated(_)));
    }
}
