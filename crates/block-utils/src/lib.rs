//! Helpers for querying an Ethereum-compatible chain over JSON-RPC: locating
//! the block nearest to a timestamp and estimating gas price tiers from
//! recent fee history. All chain access goes through an explicitly injected
//! [`ChainClient`].

pub mod block_finder;
pub mod chain_client;
pub mod config;
pub mod diagnostics;
pub mod gas_price;
pub mod jsonrpc_utils;

#[cfg(test)]
mod test_utils;

pub use block_finder::{find_block_by_timestamp, BlockFinderError};
pub use chain_client::{BlockHeader, ChainClient, FeeHistory};
pub use config::Config;
pub use gas_price::{
    estimate_gas_price, FeeEstimate, FeeTier, RewardPercentiles, DEFAULT_FEE_HISTORY_WINDOW,
};
pub use jsonrpc_utils::JsonRpcRetry;
