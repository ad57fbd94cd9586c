use crate::jsonrpc_utils::JsonRpcRetry;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use url::Url;
use web3::helpers::{self, CallFuture};
use web3::types::{BlockNumber, H256, U256, U64};
use web3::{Transport, Web3};

/// The subset of a block that every supported chain agrees on. The pending
/// block carries no number yet, so `number` stays optional; `baseFeePerGas`
/// is absent on pre-EIP-1559 endpoints. Everything else the endpoint returns
/// is kept verbatim in `extra` and never interpreted here.
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
    pub number: Option<U64>,
    pub timestamp: U256,
    pub base_fee_per_gas: Option<U256>,
    pub hash: Option<H256>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BlockHeader {
    /// Block timestamp in seconds since the unix epoch.
    pub fn timestamp_secs(&self) -> u64 {
        self.timestamp.low_u64()
    }
}

/// Reply shape of `eth_feeHistory`. Only the per-block percentile rewards
/// are interpreted; endpoints that return no `reward` field at all are
/// treated by callers as having produced zero samples.
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeHistory {
    pub reward: Option<Vec<Vec<U256>>>,
}

/// Query-only handle to a single chain's JSON-RPC endpoint. Constructed once
/// per endpoint and passed explicitly to the helpers in this crate, so tests
/// can substitute any [`web3::Transport`].
#[derive(Debug, Clone)]
pub struct ChainClient<T>
where
    T: Transport,
{
    chain_name: String,
    web3: Web3<T>,
}

impl ChainClient<JsonRpcRetry> {
    /// An HTTP client that retries transient failures with exponential
    /// backoff for up to `retry_max_wait` per call.
    pub fn http(chain_name: &str, jrpc_url: &Url, retry_max_wait: Duration) -> Self {
        let transport = JsonRpcRetry::http(jrpc_url, chain_name, retry_max_wait);
        Self::new(chain_name, transport)
    }
}

impl<T> ChainClient<T>
where
    T: Transport,
{
    pub fn new(chain_name: &str, transport: T) -> Self {
        Self {
            chain_name: chain_name.to_string(),
            web3: Web3::new(transport),
        }
    }

    pub fn chain_name(&self) -> &str {
        &self.chain_name
    }

    /// Fetches a single block header. A missing block is reported as
    /// [`web3::Error::InvalidResponse`] rather than `None`; every block this
    /// crate asks for is expected to exist.
    pub async fn block(&self, block: BlockNumber) -> web3::Result<BlockHeader> {
        let block = helpers::serialize(&block);
        // Transaction bodies are never needed here.
        let include_txs = helpers::serialize(&false);

        let fut = self
            .web3
            .transport()
            .execute("eth_getBlockByNumber", vec![block.clone(), include_txs]);
        let call_fut: CallFuture<Option<BlockHeader>, T::Out> = CallFuture::new(fut);
        let header = call_fut.await?;

        header.ok_or_else(|| web3::Error::InvalidResponse(format!("block {} not found", block)))
    }

    /// Number of the most recently mined block.
    pub async fn latest_block_number(&self) -> web3::Result<U64> {
        self.web3.eth().block_number().await
    }

    /// Fetches reward samples at the requested percentiles for the `window`
    /// blocks ending at `newest`.
    pub async fn fee_history(
        &self,
        window: u64,
        newest: BlockNumber,
        percentiles: &[f64],
    ) -> web3::Result<FeeHistory> {
        let window = helpers::serialize(&U256::from(window));
        let newest = helpers::serialize(&newest);
        let percentiles = helpers::serialize(&percentiles);

        let fut = self
            .web3
            .transport()
            .execute("eth_feeHistory", vec![window, newest, percentiles]);
        let call_fut: CallFuture<FeeHistory, T::Out> = CallFuture::new(fut);
        call_fut.await
    }
}
