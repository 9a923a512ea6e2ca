// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Bounded walk of a block interval through the range fetcher.

use super::index::RedeemIndex;
use crate::error::TrackerResult;
use crate::eth_client::EthClient;
use crate::metrics::TrackerMetrics;
use crate::types::EventFilter;
use ethers::providers::JsonRpcClient;
use tracing::{debug, info};

/// Partition `[from, to]` into consecutive fetch ranges of `range_limit + 1`
/// blocks each, strictly increasing, no overlap, no gap. The final range is
/// clamped to `to`, so the union covers `[from, to]` exactly.
///
/// A `range_limit` of 0 means the provider accepts arbitrary ranges and the
/// whole interval is fetched in one call.
pub(crate) fn sub_ranges(from: u64, to: u64, range_limit: u64) -> Vec<(u64, u64)> {
    if range_limit == 0 {
        return vec![(from, to)];
    }
    let mut ranges = Vec::new();
    let mut current = from;
    while current <= to {
        let end = std::cmp::min(current.saturating_add(range_limit), to);
        ranges.push((current, end));
        if end == u64::MAX {
            break;
        }
        current = end + 1;
    }
    ranges
}

/// Walk `[from, to]` in bounded sub-ranges, appending every decoded redeem
/// to the index as soon as its sub-range returns.
///
/// A fetch error aborts the walk and propagates; records from completed
/// sub-ranges stay in the index, and the caller owns the decision to resume
/// from the last completed boundary. Returns the number of records found.
pub(crate) async fn scan_range<P>(
    client: &EthClient<P>,
    filter: &EventFilter,
    index: &RedeemIndex,
    metrics: &TrackerMetrics,
    range_limit: u64,
    from: u64,
    to: u64,
) -> TrackerResult<u64>
where
    P: JsonRpcClient + 'static,
{
    let mut found = 0u64;
    let mut progress = ProgressReporter::new(from, to);
    for (start, end) in sub_ranges(from, to, range_limit) {
        let redeems = client.get_redeems_in_range(filter, start, end).await?;
        for redeem in redeems {
            debug!(
                "recorded redeem of token {} by {} at block {}",
                redeem.token_id, redeem.validator_identity, redeem.redeemed_height
            );
            index.insert(redeem);
            metrics.redeem_events_recorded.inc();
            found += 1;
        }
        progress.update(end, metrics);
    }
    Ok(found)
}

/// Surfaces scan progress on each whole-percent crossing. Advisory only.
struct ProgressReporter {
    from: u64,
    to: u64,
    last_percent: u64,
}

impl ProgressReporter {
    fn new(from: u64, to: u64) -> Self {
        Self {
            from,
            to,
            last_percent: 0,
        }
    }

    fn update(&mut self, position: u64, metrics: &TrackerMetrics) {
        let span = self.to.saturating_sub(self.from) as u128 + 1;
        let done = std::cmp::min(position, self.to).saturating_sub(self.from) as u128 + 1;
        let percent = (done * 100 / span) as u64;
        if percent > self.last_percent {
            info!(
                "scan progress: {}% (block {} of {}-{})",
                percent, position, self.from, self.to
            );
            metrics.backfill_progress_percent.set(percent as i64);
            self.last_percent = percent;
        }
    }
}
