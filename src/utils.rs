// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use ethers::utils::keccak256;

/// Compute the log topic for a human-readable event signature such as
/// `Redeemed(uint256,bytes32)`: the Keccak-256 hash of its UTF-8 bytes,
/// hex-encoded with a `0x` prefix.
///
/// An input that already starts with `0x` is treated as a precomputed topic
/// hash and returned unchanged.
pub fn get_event_signature(event_signature: &str) -> String {
    if event_signature.starts_with("0x") {
        return event_signature.to_string();
    }
    format!("0x{}", hex::encode(keccak256(event_signature.as_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redeemed_event_signature() {
        assert_eq!(
            get_event_signature("Redeemed(uint256,bytes32)"),
            "0x4fc9c25b46f7854a495f8830e3d532a48cd64b4e4e3f6038557fe5669885bbe6"
        );
    }

    #[test]
    fn test_signature_is_deterministic() {
        let first = get_event_signature("Transfer(address,address,uint256)");
        let second = get_event_signature("Transfer(address,address,uint256)");
        assert_eq!(first, second);
        assert_eq!(first.len(), 66);
        assert!(first.starts_with("0x"));
    }

    #[test]
    fn test_prefixed_input_passes_through() {
        let precomputed = "0x4fc9c25b46f7854a495f8830e3d532a48cd64b4e4e3f6038557fe5669885bbe6";
        assert_eq!(get_event_signature(precomputed), precomputed);
    }
}
