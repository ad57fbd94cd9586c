use jsonrpc_core::{Call, Params, Value};
use serde_json::json;
use std::sync::{Arc, Mutex};
use web3::{helpers, RequestId, Transport};

/// An in-memory JSON-RPC endpoint backed by a synthetic chain with a fixed
/// block interval. Records every block number it is asked for, so tests can
/// assert which blocks a search touched.
#[derive(Debug, Clone)]
pub struct MockChain {
    genesis_timestamp: u64,
    block_interval: u64,
    head: u64,
    // Block spacing switches to a second interval after this block.
    interval_change: Option<(u64, u64)>,
    base_fee: Option<u64>,
    rewards: Vec<Vec<u64>>,
    fee_history_fails: bool,
    queried_blocks: Arc<Mutex<Vec<u64>>>,
}

impl MockChain {
    pub fn new(genesis_timestamp: u64, block_interval: u64, head: u64) -> Self {
        Self {
            genesis_timestamp,
            block_interval,
            head,
            interval_change: None,
            base_fee: None,
            rewards: vec![],
            fee_history_fails: false,
            queried_blocks: Arc::new(Mutex::new(vec![])),
        }
    }

    pub fn with_interval_change(mut self, from_block: u64, new_interval: u64) -> Self {
        self.interval_change = Some((from_block, new_interval));
        self
    }

    pub fn with_base_fee(mut self, base_fee: u64) -> Self {
        self.base_fee = Some(base_fee);
        self
    }

    pub fn with_rewards(mut self, rewards: Vec<Vec<u64>>) -> Self {
        self.rewards = rewards;
        self
    }

    pub fn with_fee_history_failure(mut self) -> Self {
        self.fee_history_fails = true;
        self
    }

    pub fn timestamp_of(&self, number: u64) -> u64 {
        match self.interval_change {
            Some((at, new_interval)) if number > at => {
                self.genesis_timestamp + at * self.block_interval + (number - at) * new_interval
            }
            _ => self.genesis_timestamp + number * self.block_interval,
        }
    }

    /// Numbers of all blocks requested by number so far.
    pub fn queried_blocks(&self) -> Vec<u64> {
        self.queried_blocks.lock().unwrap().clone()
    }

    fn block_json(&self, number: u64, pending: bool) -> Value {
        let mut block = json!({
            "number": format!("{number:#x}"),
            "hash": format!("{number:#066x}"),
            "parentHash": format!("{:#066x}", number.saturating_sub(1)),
            "timestamp": format!("{:#x}", self.timestamp_of(number)),
            "gasUsed": "0x0",
            "gasLimit": "0x1c9c380",
            "transactions": [],
        });
        if pending {
            block["number"] = Value::Null;
            block["hash"] = Value::Null;
        }
        if let Some(base_fee) = self.base_fee {
            block["baseFeePerGas"] = json!(format!("{base_fee:#x}"));
        }
        block
    }

    fn respond(&self, request: Call) -> web3::error::Result<Value> {
        let (method, params) = match request {
            Call::MethodCall(call) => (call.method, call.params),
            other => panic!("unexpected JSON-RPC call: {other:?}"),
        };
        let params = match params {
            Params::Array(values) => values,
            Params::None => vec![],
            other => panic!("unexpected parameter shape: {other:?}"),
        };

        match method.as_str() {
            "eth_blockNumber" => Ok(Value::String(format!("{:#x}", self.head))),
            "eth_getBlockByNumber" => {
                match params[0].as_str().expect("block id must be a string") {
                    "latest" => Ok(self.block_json(self.head, false)),
                    "pending" => Ok(self.block_json(self.head + 1, true)),
                    hex => {
                        let number = u64::from_str_radix(hex.trim_start_matches("0x"), 16)
                            .expect("block number must be hex");
                        self.queried_blocks.lock().unwrap().push(number);
                        if number <= self.head {
                            Ok(self.block_json(number, false))
                        } else {
                            Ok(Value::Null)
                        }
                    }
                }
            }
            "eth_feeHistory" => {
                if self.fee_history_fails {
                    return Err(web3::Error::Rpc(jsonrpc_core::Error::method_not_found()));
                }
                let reward: Vec<Vec<String>> = self
                    .rewards
                    .iter()
                    .map(|block| block.iter().map(|tip| format!("{tip:#x}")).collect())
                    .collect();
                Ok(json!({
                    "oldestBlock": format!(
                        "{:#x}",
                        self.head.saturating_sub(self.rewards.len() as u64)
                    ),
                    "reward": reward,
                }))
            }
            other => panic!("unexpected JSON-RPC method: {other}"),
        }
    }
}

impl Transport for MockChain {
    type Out = futures::future::Ready<web3::error::Result<Value>>;

    fn prepare(&self, method: &str, params: Vec<Value>) -> (RequestId, Call) {
        (1, helpers::build_request(1, method, params))
    }

    fn send(&self, _id: RequestId, request: Call) -> Self::Out {
        futures::future::ready(self.respond(request))
    }
}
