use backoff::future::retry;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use futures::TryFutureExt;
use jsonrpc_core::{Call, Value};
use std::sync::Arc;
use std::time::Duration;
use std::{future::Future, pin::Pin};
use tracing::trace;
use url::Url;
use web3::{transports::Http, RequestId};

/// A wrapper around [`web3::Transport`] that retries JSON-RPC calls on
/// failure, backing off exponentially until `max_wait` has elapsed. All
/// retry policy lives here; the callers issue plain calls.
#[derive(Debug, Clone)]
pub struct JsonRpcRetry<T = Http> {
    inner: Arc<T>,
    strategy: ExponentialBackoff,
    chain_name: String,
}

impl<T> JsonRpcRetry<T> {
    pub fn new(transport: T, chain_name: impl Into<String>, max_wait: Duration) -> Self {
        let strategy = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(max_wait))
            .build();

        Self {
            inner: Arc::new(transport),
            strategy,
            chain_name: chain_name.into(),
        }
    }
}

impl JsonRpcRetry {
    pub fn http(jrpc_url: &Url, chain_name: impl Into<String>, max_wait: Duration) -> Self {
        // Unwrap: URLs were already parsed and are valid.
        let client = Http::new(jrpc_url.as_str()).expect("failed to create HTTP transport");
        Self::new(client, chain_name, max_wait)
    }
}

impl<T> web3::Transport for JsonRpcRetry<T>
where
    T: web3::Transport + 'static,
{
    type Out = Pin<Box<dyn Future<Output = web3::error::Result<Value>>>>;

    fn prepare(&self, method: &str, params: Vec<Value>) -> (RequestId, Call) {
        self.inner.prepare(method, params)
    }

    fn send(&self, id: RequestId, request: Call) -> Self::Out {
        let strategy = self.strategy.clone();
        let transport = Arc::clone(&self.inner);
        let chain_name = self.chain_name.clone();
        let op = move || {
            trace!(?id, ?request, chain = %chain_name, "Sending JRPC call");
            transport
                .send(id, request.clone())
                .map_err(backoff::Error::transient)
        };
        Box::pin(retry(strategy, op))
    }
}
