use crate::chain_client::{BlockHeader, ChainClient};
use thiserror::Error;
use tracing::{debug, trace};
use web3::types::{BlockNumber, U64};
use web3::Transport;

/// How far behind the head the reference block for the average block
/// duration sits. Clamped to genesis on chains shorter than this.
const BLOCK_TIME_SAMPLE_SPAN: u64 = 10_000;

#[derive(Debug, Error)]
pub enum BlockFinderError {
    #[error(
        "target timestamp {target_secs}s is ahead of the chain head \
         (block {head_number} at {head_timestamp}s)"
    )]
    FutureTimestamp {
        target_secs: u64,
        head_number: u64,
        head_timestamp: u64,
    },
    #[error(
        "no block as old as {target_secs}s exists; \
         the genesis block was mined at {genesis_timestamp}s"
    )]
    GenesisBoundary {
        target_secs: u64,
        genesis_timestamp: u64,
    },
    #[error("Ethereum client error: {0}")]
    Web3(#[from] web3::Error),
}

/// Finds the block mined nearest to `target_timestamp_ms`.
///
/// The search estimates an average block duration from a fixed span behind
/// the head, then repeatedly steps a candidate block by the estimated block
/// distance to the target. It settles once the candidate is within one
/// average block duration of the target, or as soon as the estimated
/// distance stops shrinking, so on chains with irregular block times the
/// result can be off by a few blocks. Adequate for historical analytics, not
/// for consensus-critical lookups.
pub async fn find_block_by_timestamp<T>(
    client: &ChainClient<T>,
    target_timestamp_ms: u64,
) -> Result<BlockHeader, BlockFinderError>
where
    T: Transport,
{
    let target_secs = target_timestamp_ms / 1000;

    let head = client.block(BlockNumber::Latest).await?;
    let head_number = head
        .number
        .ok_or_else(|| web3::Error::InvalidResponse("head block has no number".to_string()))?
        .as_u64();
    let head_timestamp = head.timestamp_secs();

    if target_secs > head_timestamp {
        return Err(BlockFinderError::FutureTimestamp {
            target_secs,
            head_number,
            head_timestamp,
        });
    }

    let avg_block_duration = average_block_duration(client, head_number, head_timestamp).await?;
    debug!(
        head_number,
        head_timestamp, avg_block_duration, target_secs, "Starting block search"
    );

    let mut candidate = head;
    let mut candidate_number = head_number;
    let mut previous_step: Option<i64> = None;

    loop {
        let distance_secs = target_secs as i64 - candidate.timestamp_secs() as i64;
        if distance_secs.unsigned_abs() < avg_block_duration {
            return Ok(candidate);
        }

        let step = distance_secs / avg_block_duration as i64;

        // The average block duration is only an estimate. Once the estimated
        // block distance stops shrinking the search is oscillating around
        // the target and the current candidate is as close as this method
        // gets.
        if let Some(previous) = previous_step {
            if step.unsigned_abs() >= previous.unsigned_abs() {
                return Ok(candidate);
            }
        }

        let next_number = candidate_number as i64 + step;
        if next_number < 0 {
            let genesis = client.block(BlockNumber::Number(U64::zero())).await?;
            return Err(BlockFinderError::GenesisBoundary {
                target_secs,
                genesis_timestamp: genesis.timestamp_secs(),
            });
        }

        trace!(
            candidate = candidate_number,
            step,
            distance_secs,
            "Stepping towards target timestamp"
        );

        candidate_number = next_number as u64;
        candidate = client
            .block(BlockNumber::Number(candidate_number.into()))
            .await?;
        previous_step = Some(step);
    }
}

/// Average block duration in seconds over the last [`BLOCK_TIME_SAMPLE_SPAN`]
/// blocks, floored at one second to keep the integer divisions sane on fast
/// or irregular chains.
async fn average_block_duration<T>(
    client: &ChainClient<T>,
    head_number: u64,
    head_timestamp: u64,
) -> Result<u64, BlockFinderError>
where
    T: Transport,
{
    let reference_number = head_number.saturating_sub(BLOCK_TIME_SAMPLE_SPAN);
    let reference = client
        .block(BlockNumber::Number(reference_number.into()))
        .await?;

    let span = (head_number - reference_number).max(1);
    let elapsed = head_timestamp.saturating_sub(reference.timestamp_secs());
    Ok((elapsed / span).max(1))
}
