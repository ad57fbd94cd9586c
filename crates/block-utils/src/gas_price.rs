use crate::chain_client::ChainClient;
use serde::Serialize;
use tracing::warn;
use web3::types::{BlockNumber, U256, U64};
use web3::Transport;

/// Number of recent blocks sampled by [`estimate_gas_price`] by default.
pub const DEFAULT_FEE_HISTORY_WINDOW: u64 = 5;

/// Base fee assumed when the pending block carries none, e.g. on endpoints
/// that omit EIP-1559 fields. 0.1 gwei.
const FALLBACK_BASE_FEE: u64 = 100_000_000;

/// Reward percentiles backing the three speed tiers. Named fields instead of
/// a bare list, so a tier can never be confused with another by position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RewardPercentiles {
    pub slow: f64,
    pub medium: f64,
    pub fast: f64,
}

impl Default for RewardPercentiles {
    fn default() -> Self {
        Self {
            slow: 10.0,
            medium: 50.0,
            fast: 90.0,
        }
    }
}

impl RewardPercentiles {
    fn as_vec(&self) -> Vec<f64> {
        vec![self.slow, self.medium, self.fast]
    }
}

/// A single gas price tier, in wei.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeeTier {
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeeEstimate {
    pub slow: FeeTier,
    pub medium: FeeTier,
    pub fast: FeeTier,
    pub base_fee_per_gas: U256,
    pub pending_block_number: U64,
    pub pending_block_timestamp: U256,
    /// True when the endpoint could not serve `eth_feeHistory` and the tips
    /// fell back to zero. Lets callers tell "no recent tips" apart from "fee
    /// history unavailable".
    pub used_fallback_samples: bool,
}

/// Estimates slow, medium and fast gas price tiers from recent priority fee
/// percentiles.
///
/// Each tier's tip is the median reward observed at its percentile over the
/// sampled window; the max fee adds 25% headroom over the pending block's
/// base fee on top of the tip. The three queries are issued concurrently.
pub async fn estimate_gas_price<T>(
    client: &ChainClient<T>,
    percentiles: &RewardPercentiles,
    window: u64,
) -> web3::Result<FeeEstimate>
where
    T: Transport,
{
    let percentiles_vec = percentiles.as_vec();
    let (pending, latest_number, fee_history) = futures::join!(
        client.block(BlockNumber::Pending),
        client.latest_block_number(),
        client.fee_history(window, BlockNumber::Pending, &percentiles_vec),
    );
    let pending = pending?;
    let latest_number = latest_number?;

    // Not every endpoint implements eth_feeHistory. Estimate from the base
    // fee alone in that case instead of failing the whole call.
    let (rewards, used_fallback_samples) = match fee_history {
        Ok(history) => match history.reward {
            Some(reward) => (reward, false),
            None => (vec![], true),
        },
        Err(error) => {
            warn!(
                chain = %client.chain_name(),
                %error,
                "Fee history unavailable, assuming zero tips"
            );
            (vec![], true)
        }
    };

    let base_fee_per_gas = pending
        .base_fee_per_gas
        .unwrap_or_else(|| FALLBACK_BASE_FEE.into());

    let tier = |index: usize| {
        let tip = median(rewards.iter().filter_map(|block| block.get(index).copied()));
        FeeTier {
            max_fee_per_gas: with_headroom(base_fee_per_gas) + tip,
            max_priority_fee_per_gas: tip,
        }
    };

    Ok(FeeEstimate {
        slow: tier(0),
        medium: tier(1),
        fast: tier(2),
        base_fee_per_gas,
        pending_block_number: latest_number + 1u64,
        pending_block_timestamp: pending.timestamp,
        used_fallback_samples,
    })
}

/// 1.25x, rounded to the nearest wei.
fn with_headroom(base_fee: U256) -> U256 {
    (base_fee * 125u64 + 50u64) / 100u64
}

/// Median of an unordered sequence: zero when empty, the integer mean of the
/// two central values when the count is even.
fn median(values: impl Iterator<Item = U256>) -> U256 {
    let mut values: Vec<U256> = values.collect();
    if values.is_empty() {
        return U256::zero();
    }
    values.sort_unstable();

    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) / 2u64
    }
}
