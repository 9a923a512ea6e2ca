// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::error::{TrackerError, TrackerResult};
use crate::types::EventFilter;
use ethers::types::Address as EthAddress;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for one redeem tracker instance.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TrackerConfig {
    // Rpc url for the Eth fullnode used to query redeem logs.
    pub eth_rpc_url: String,
    // The validator pass contract emitting redeem events.
    pub contract_address: String,
    // Canonical event signature, e.g. "Redeemed(uint256,bytes32)", or a
    // precomputed 0x topic hash.
    pub event_signature: String,
    // The block at which the contract was deployed on-chain.
    pub deploy_block: u64,
    // Maximum block span per log query; 0 means the provider accepts
    // arbitrary ranges.
    #[serde(default = "default_range_limit")]
    pub range_limit: u64,
    // Seconds between polling ticks once caught up.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    // Number of most-recent blocks held back from polling scans.
    #[serde(default = "default_confirmations")]
    pub confirmations: u64,
}

fn default_range_limit() -> u64 {
    1000
}

fn default_poll_interval_secs() -> u64 {
    120
}

fn default_confirmations() -> u64 {
    12
}

impl TrackerConfig {
    pub fn validate(&self) -> TrackerResult<()> {
        if self.eth_rpc_url.is_empty() {
            return Err(TrackerError::InvalidFilter(
                "eth-rpc-url must not be empty".to_string(),
            ));
        }
        if self.event_signature.is_empty() {
            return Err(TrackerError::InvalidFilter(
                "event-signature must not be empty".to_string(),
            ));
        }
        self.contract_address.parse::<EthAddress>().map_err(|e| {
            TrackerError::InvalidFilter(format!(
                "invalid contract-address {}: {}",
                self.contract_address, e
            ))
        })?;
        Ok(())
    }

    pub fn event_filter(&self) -> TrackerResult<EventFilter> {
        EventFilter::new(
            &self.contract_address,
            &self.event_signature,
            self.deploy_block,
        )
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}
