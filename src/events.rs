// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Decoding of raw Ethereum logs into redeem events.

use ethers::types::Log;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A single on-chain occurrence of the redeem event.
///
/// The validator identity is carried in the second indexed topic and the
/// token id in the log payload. Both are kept in their 0x-hex wire rendering
/// so verification callers can compare against values received off-chain.
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemEvent {
    /// NFT token id, 0x-hex encoded log payload
    pub token_id: String,
    /// Validator identity the token was redeemed under
    pub validator_identity: String,
    /// Block height at which the validator pass was redeemed
    pub redeemed_height: u64,
}

impl RedeemEvent {
    pub fn new(
        token_id: impl Into<String>,
        validator_identity: impl Into<String>,
        redeemed_height: u64,
    ) -> Self {
        Self {
            token_id: token_id.into(),
            validator_identity: validator_identity.into(),
            redeemed_height,
        }
    }

    /// Decode a raw log into a redeem event.
    ///
    /// Returns `None` when the log carries no identity topic, so one
    /// malformed record never discards the rest of a range. A log without a
    /// block number still decodes; its height defaults to 0 with a warning.
    pub fn try_from_log(log: &Log) -> Option<Self> {
        let validator_identity = match log.topics.get(1) {
            Some(topic) => format!("{:?}", topic),
            None => {
                warn!(
                    "skipping log without identity topic: tx={:?}, topics={:?}",
                    log.transaction_hash, log.topics
                );
                return None;
            }
        };
        let redeemed_height = match log.block_number {
            Some(number) => number.as_u64(),
            None => {
                warn!(
                    "log without block number, recording redeem at height 0: tx={:?}",
                    log.transaction_hash
                );
                0
            }
        };
        Some(Self {
            token_id: format!("0x{}", hex::encode(&log.data)),
            validator_identity,
            redeemed_height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::{H256, U64};

    fn log_with(topics: Vec<H256>, data: Vec<u8>, block_number: Option<u64>) -> Log {
        Log {
            topics,
            data: data.into(),
            block_number: block_number.map(U64::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_decode_redeem_log() {
        let identity = H256::from_low_u64_be(0xabc);
        let log = log_with(vec![H256::zero(), identity], vec![0x01], Some(107));
        let event = RedeemEvent::try_from_log(&log).unwrap();
        assert_eq!(event.token_id, "0x01");
        assert_eq!(event.validator_identity, format!("{:?}", identity));
        assert_eq!(event.redeemed_height, 107);
    }

    #[test]
    fn test_missing_identity_topic_is_skipped() {
        let log = log_with(vec![H256::zero()], vec![0x01], Some(107));
        assert!(RedeemEvent::try_from_log(&log).is_none());
    }

    #[test]
    fn test_missing_block_number_defaults_to_zero() {
        let log = log_with(vec![H256::zero(), H256::from_low_u64_be(1)], vec![0x02], None);
        let event = RedeemEvent::try_from_log(&log).unwrap();
        assert_eq!(event.redeemed_height, 0);
    }

    #[test]
    fn test_empty_payload_decodes() {
        let log = log_with(vec![H256::zero(), H256::from_low_u64_be(1)], vec![], Some(5));
        let event = RedeemEvent::try_from_log(&log).unwrap();
        assert_eq!(event.token_id, "0x");
    }
}
