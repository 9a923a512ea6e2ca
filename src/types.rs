// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::error::{TrackerError, TrackerResult};
use crate::utils::get_event_signature;
use ethers::types::Address as EthAddress;
use ethers::types::H256;

/// Describes which log stream a tracker watches.
///
/// Constructed once per tracked contract and event pair, then immutable.
/// All string inputs are parsed here so that nothing malformed ever reaches
/// the RPC boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFilter {
    /// Contract that emits the redeem event
    pub contract_address: EthAddress,
    /// Keccak-256 topic hash of the event signature
    pub event_topic: H256,
    /// Block at which the contract was deployed on-chain
    pub deploy_block: u64,
}

impl EventFilter {
    /// Build a filter from a contract address string and either a canonical
    /// event signature (`Redeemed(uint256,bytes32)`) or a precomputed `0x`
    /// topic hash.
    pub fn new(
        contract_address: &str,
        event_signature: &str,
        deploy_block: u64,
    ) -> TrackerResult<Self> {
        let contract_address = contract_address.parse::<EthAddress>().map_err(|e| {
            TrackerError::InvalidFilter(format!(
                "invalid contract address {}: {}",
                contract_address, e
            ))
        })?;
        let topic = get_event_signature(event_signature);
        let event_topic = topic
            .parse::<H256>()
            .map_err(|e| TrackerError::InvalidFilter(format!("invalid event topic {}: {}", topic, e)))?;
        Ok(Self {
            contract_address,
            event_topic,
            deploy_block,
        })
    }
}

/// Lifecycle states of a redeem tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Idle,
    Backfilling,
    Polling,
    Stopped,
}
