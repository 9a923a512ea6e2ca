// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::error::{TrackerError, TrackerResult};
use crate::events::RedeemEvent;
use crate::metered_eth_provider::{new_metered_eth_provider, MeteredEthHttpProvider};
use crate::metrics::TrackerMetrics;
use crate::types::EventFilter;
use ethers::providers::{JsonRpcClient, Middleware, Provider};
use ethers::types::Filter;
use std::sync::Arc;
use std::time::Duration;
use tap::TapFallible;

#[cfg(test)]
use ethers::providers::MockProvider;

/// Upper bound on any single collaborator call. The provider is untrusted
/// and may stall indefinitely.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct EthClient<P> {
    provider: Provider<P>,
    request_timeout: Duration,
}

impl EthClient<MeteredEthHttpProvider> {
    pub fn new(provider_url: &str, metrics: Arc<TrackerMetrics>) -> anyhow::Result<Self> {
        let provider = new_metered_eth_provider(provider_url, metrics)?;
        Ok(Self {
            provider,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }
}

#[cfg(test)]
impl EthClient<MockProvider> {
    pub fn new_mocked(provider: MockProvider) -> Self {
        Self {
            provider: Provider::new(provider),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl<P> EthClient<P>
where
    P: JsonRpcClient + 'static,
{
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Get the current chain head block number.
    pub async fn get_latest_block_id(&self) -> TrackerResult<u64> {
        let number = tokio::time::timeout(self.request_timeout, self.provider.get_block_number())
            .await
            .map_err(|_| {
                TrackerError::TransientProviderError("eth_blockNumber timed out".to_string())
            })?
            .map_err(TrackerError::from)
            .tap_err(|e| tracing::error!("get_latest_block_id failed. Error {:?}", e))?;
        Ok(number.as_u64())
    }

    // Note: query may fail if the range is too big for the provider.
    // Callsite is responsible for chunking the query.
    pub async fn get_redeems_in_range(
        &self,
        filter: &EventFilter,
        from_block: u64,
        to_block: u64,
    ) -> TrackerResult<Vec<RedeemEvent>> {
        if from_block > to_block {
            return Err(TrackerError::InvalidBlockRange(format!(
                "from_block {} is past to_block {}",
                from_block, to_block
            )));
        }
        // Block bounds are rendered as hex quantities by the typed filter,
        // both through the same path.
        let request = Filter::new()
            .from_block(from_block)
            .to_block(to_block)
            .address(filter.contract_address)
            .topic0(filter.event_topic);
        let logs = tokio::time::timeout(self.request_timeout, self.provider.get_logs(&request))
            .await
            .map_err(|_| {
                TrackerError::TransientProviderError(format!(
                    "eth_getLogs timed out for blocks {}-{}",
                    from_block, to_block
                ))
            })?
            .map_err(TrackerError::from)
            .tap_err(|e| {
                tracing::error!(
                    "get_redeems_in_range failed. Filter: {:?}. Error {:?}",
                    request,
                    e
                )
            })?;

        // Safeguard check that all logs are emitted from the requested contract
        if logs.iter().any(|log| log.address != filter.contract_address) {
            return Err(TrackerError::ProviderError(format!(
                "Provider returns logs from different contract address (expected: {:?})",
                filter.contract_address
            )));
        }

        // Decode every log, skipping ones the provider returned malformed.
        // Records outside the requested range are kept: the authoritative
        // bound is the request we sent, not a post-filter.
        Ok(logs.iter().filter_map(RedeemEvent::try_from_log).collect())
    }
}
