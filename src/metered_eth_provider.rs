// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::metrics::TrackerMetrics;
use ethers::providers::{Http, HttpClientError, JsonRpcClient, Provider};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use url::{ParseError, Url};

/// Minimum delay between requests to avoid rate limiting (in milliseconds).
/// Public RPC providers throttle aggressively; the tracker issues one
/// request at a time, so pacing them is enough.
const MIN_REQUEST_DELAY_MS: u64 = 500;

#[derive(Debug, Clone)]
pub struct MeteredEthHttpProvider {
    inner: Http,
    metrics: Arc<TrackerMetrics>,
    /// Last request time to enforce minimum delay between requests
    last_request_time: Arc<Mutex<Instant>>,
}

#[async_trait::async_trait]
impl JsonRpcClient for MeteredEthHttpProvider {
    type Error = HttpClientError;

    async fn request<T: Serialize + Send + Sync + Debug, R: DeserializeOwned + Send>(
        &self,
        method: &str,
        params: T,
    ) -> Result<R, HttpClientError> {
        // Enforce minimum delay between requests to avoid rate limiting
        let mut last_request = self.last_request_time.lock().await;
        let elapsed = Instant::now().saturating_duration_since(*last_request);
        if elapsed.as_millis() < MIN_REQUEST_DELAY_MS as u128 {
            let delay = Duration::from_millis(MIN_REQUEST_DELAY_MS) - elapsed;
            tokio::time::sleep(delay).await;
        }
        *last_request = Instant::now();
        drop(last_request);

        self.metrics
            .eth_rpc_queries
            .with_label_values(&[method])
            .inc();
        let _guard = self
            .metrics
            .eth_rpc_queries_latency
            .with_label_values(&[method])
            .start_timer();

        let result = self.inner.request(method, &params).await;

        // Update node connection status based on request result
        match &result {
            Ok(_) => self.metrics.eth_node_connected.set(1),
            Err(_) => self.metrics.eth_node_connected.set(0),
        }
        result
    }
}

impl MeteredEthHttpProvider {
    pub fn new(url: impl Into<Url>, metrics: Arc<TrackerMetrics>) -> Self {
        let inner = Http::new(url);
        Self {
            inner,
            metrics,
            last_request_time: Arc::new(Mutex::new(
                Instant::now() - Duration::from_millis(MIN_REQUEST_DELAY_MS),
            )),
        }
    }
}

pub fn new_metered_eth_provider(
    url: &str,
    metrics: Arc<TrackerMetrics>,
) -> Result<Provider<MeteredEthHttpProvider>, ParseError> {
    let http_provider = MeteredEthHttpProvider::new(Url::parse(url)?, metrics);
    Ok(Provider::new(http_provider))
}
