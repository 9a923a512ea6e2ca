// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

pub mod config;
pub mod error;
pub mod eth_client;
pub mod events;
pub mod metered_eth_provider;
pub mod metrics;
pub mod tracker;
pub mod types;
pub mod utils;

pub use tracker::{RedeemIndex, RedeemTracker};
