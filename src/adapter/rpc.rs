use super::{AdapterError, AdapterQuote, PriceAdapter};
use crate::config::{AdapterConfig, PriceConfig, StreamConfig};
use crate::price;
use crate::trade_handler::SolPriceSource;
use async_trait::async_trait;
use serde_json::json;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

const BONDING_CURVE_SEED: &[u8] = b"bonding-curve";

/// Reads bonding-curve vault reserves directly from the chain when neither
/// the pool-state history nor the aggregator have anything for a mint
/// (§4.8 adapter 3, "slowest, used only when the above two fail").
///
/// Pool PDA derivation and the account layout assumed here follow the
/// bonding-curve program's convention (seed `"bonding-curve"` plus mint,
/// discriminator-prefixed reserve fields): no upstream schema was available
/// to confirm exact field order, so this is a documented approximation.
pub struct RpcAdapter {
    client: RpcClient,
    bonding_curve_program_id: Pubkey,
    price_config: PriceConfig,
    sol_price: Arc<dyn SolPriceSource>,
}

impl RpcAdapter {
    pub fn new(adapter_config: AdapterConfig, stream_config: StreamConfig, price_config: PriceConfig, sol_price: Arc<dyn SolPriceSource>) -> Result<Self, String> {
        let bonding_curve_program_id = Pubkey::from_str(&stream_config.bonding_curve_program_id)
            .map_err(|e| format!("invalid bonding curve program id: {e}"))?;
        let client = RpcClient::new_with_timeout(
            adapter_config.rpc_url.clone(),
            Duration::from_secs(adapter_config.rpc_timeout_secs),
        );
        Ok(Self { client, bonding_curve_program_id, price_config, sol_price })
    }

    fn derive_bonding_curve(&self, mint: &Pubkey) -> Pubkey {
        Pubkey::find_program_address(&[BONDING_CURVE_SEED, mint.as_ref()], &self.bonding_curve_program_id).0
    }

    fn decode_reserves(data: &[u8]) -> Option<(u64, u64)> {
        // discriminator(8) | virtual_token_reserves(8) | virtual_sol_reserves(8) | ...
        if data.len() < 24 {
            return None;
        }
        let virtual_token_reserves = u64::from_le_bytes(data[8..16].try_into().ok()?);
        let virtual_sol_reserves = u64::from_le_bytes(data[16..24].try_into().ok()?);
        Some((virtual_sol_reserves, virtual_token_reserves))
    }
}

#[async_trait]
impl PriceAdapter for RpcAdapter {
    fn name(&self) -> &'static str {
        "rpc"
    }

    async fn quote(&self, mint: &str) -> Result<AdapterQuote, AdapterError> {
        let mint_pubkey = Pubkey::from_str(mint).map_err(|e| AdapterError::Request(e.to_string()))?;
        let bonding_curve = self.derive_bonding_curve(&mint_pubkey);

        let account = self
            .client
            .get_account(&bonding_curve)
            .await
            .map_err(|e| AdapterError::Request(e.to_string()))?;

        let (virtual_sol_reserves, virtual_token_reserves) =
            Self::decode_reserves(&account.data).ok_or(AdapterError::Miss)?;

        let reserve_price = price::price_from_reserves(
            virtual_sol_reserves,
            virtual_token_reserves,
            self.sol_price.sol_usd(),
            self.price_config.sol_decimals,
            self.price_config.token_decimals,
            self.price_config.fully_diluted_supply,
        );
        if reserve_price.price_sol <= 0.0 {
            return Err(AdapterError::Miss);
        }

        Ok(AdapterQuote {
            price_sol: reserve_price.price_sol,
            price_usd: reserve_price.price_usd,
            market_cap_usd: reserve_price.market_cap_usd,
            source_tag: "rpc",
            metadata: json!({ "bonding_curve": bonding_curve.to_string() }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_reserves_after_discriminator() {
        let mut data = vec![0u8; 24];
        data[8..16].copy_from_slice(&1_000_000_000_000_000u64.to_le_bytes());
        data[16..24].copy_from_slice(&30_000_000_000u64.to_le_bytes());

        let (sol, token) = RpcAdapter::decode_reserves(&data).unwrap();
        assert_eq!(sol, 30_000_000_000);
        assert_eq!(token, 1_000_000_000_000_000);
    }

    #[test]
    fn short_account_data_is_none() {
        assert!(RpcAdapter::decode_reserves(&[0u8; 10]).is_none());
    }
}
