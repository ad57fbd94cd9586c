use block_utils::config::{Command, Config};
use block_utils::diagnostics::init_logging;
use block_utils::{estimate_gas_price, find_block_by_timestamp, BlockFinderError, ChainClient};
use tracing::info;

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error(transparent)]
    BlockFinder(#[from] BlockFinderError),
    #[error("Ethereum client error: {0}")]
    Web3(#[from] web3::Error),
    #[error("Failed to encode result as JSON")]
    Json(#[from] serde_json::Error),
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let (config, command) = Config::parse();
    init_logging(config.log_level);
    info!(
        chain = %config.chain_name,
        url = %config.jrpc_url,
        "Connecting JSON-RPC client."
    );

    let client = ChainClient::http(
        &config.chain_name,
        &config.jrpc_url,
        config.retry_strategy_max_wait_time,
    );

    match command {
        Command::FindBlock { timestamp_ms } => {
            let block = find_block_by_timestamp(&client, timestamp_ms).await?;
            println!("{}", serde_json::to_string_pretty(&block)?);
        }
        Command::GasPrice { window } => {
            let window = window.unwrap_or(config.fee_history_window);
            let estimate = estimate_gas_price(&client, &config.reward_percentiles, window).await?;
            println!("{}", serde_json::to_string_pretty(&estimate)?);
        }
    }

    Ok(())
}
