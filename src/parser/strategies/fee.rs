use crate::domain::{FeeEvent, FeeKind};
use crate::parser::{ParseContext, ParsedEvent, ParseStrategy};
use async_trait::async_trait;

/// Matches fee-payout log lines. A creator fee names a `recipient`; a
/// protocol fee does not (§4.2).
pub struct FeeStrategy;

impl FeeStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FeeStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ParseStrategy for FeeStrategy {
    fn name(&self) -> &'static str {
        "fee"
    }

    fn can_parse(&self, ctx: &ParseContext) -> bool {
        ctx.logs_contain_any(&["Instruction: CollectCreatorFee", "Instruction: CollectProtocolFee", "feeAmount"])
    }

    async fn parse(&self, ctx: &ParseContext) -> Result<Option<ParsedEvent>, String> {
        let recipient = ctx.scrape_log_field("recipient");
        let kind = if recipient.is_some() { FeeKind::CreatorFee } else { FeeKind::ProtocolFee };

        let pool_address = ctx.scrape_log_field("pool").ok_or_else(|| "fee: missing pool address".to_string())?;
        let mint = ctx.scrape_log_field("mint").ok_or_else(|| "fee: missing mint".to_string())?;
        let sol_fee_amount = ctx.scrape_log_field("solFeeAmount").and_then(|s| s.parse::<u64>().ok()).unwrap_or(0);
        let token_fee_amount =
            ctx.scrape_log_field("tokenFeeAmount").and_then(|s| s.parse::<u64>().ok()).unwrap_or(0);
        let sol_reserves_after =
            ctx.scrape_log_field("solReservesAfter").and_then(|s| s.parse::<u64>().ok()).unwrap_or(0);
        let token_reserves_after =
            ctx.scrape_log_field("tokenReservesAfter").and_then(|s| s.parse::<u64>().ok()).unwrap_or(0);

        let event = FeeEvent {
            signature: ctx.signature.clone(),
            kind,
            pool_address,
            mint,
            recipient,
            sol_fee_amount,
            token_fee_amount,
            sol_reserves_after,
            token_reserves_after,
            slot: ctx.slot,
            block_time: ctx.block_time,
        };

        Ok(Some(ParsedEvent::Fee(event)))
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
            program_ids: vec![],
            logs: logs.into_iter().map(str::to_string).collect(),
            instruction_data: None,
            raw_transaction: None,
        }
    }

    #[tokio::test]
    async fn presence_of_recipient_marks_creator_fee() {
        let strategy = FeeStrategy::new();
        let context = ctx(vec![
            "Program log: Instruction: CollectCreatorFee",
            "Program log: recipient: Creator11111111111111111111111111111111111",
            "Program log: pool: Pool111111111111111111111111111111111111111",
            "Program log: mint: Mint1111111111111111111111111111111111111",
            "Program log: solFeeAmount: 1000",
        ]);
        let parsed = strategy.parse(&context).await.unwrap().unwrap();
        match parsed {
            ParsedEvent::Fee(event) => assert_eq!(event.kind, FeeKind::CreatorFee),
            _ => panic!("wrong event variant"),
        }
    }

    #[tokio::test]
    async fn absence_of_recipient_marks_protocol_fee() {
        let strategy = FeeStrategy::new();
        let context = ctx(vec![
            "Program log: Instruction: CollectProtocolFee",
            "Program log: pool: Pool111111111111111111111111111111111111111",
            "Program log: mint: Mint1111111111111111111111111111111111111",
            "Program log: solFeeAmount: 500",
        ]);
        let parsed = strategy.parse(&context).await.unwrap().unwrap();
        match parsed {
            ParsedEvent::Fee(event) => assert_eq!(event.kind, FeeKind::ProtocolFee),
            _ => panic!("wrong event variant"),
        }
    }
}
