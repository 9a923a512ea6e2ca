// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Validator pass redeem tracker
//!
//! Watches a single contract's redeem event stream so that a consensus
//! callback can check, before admitting a validator, whether its identity
//! holds a redeemed pass.
//!
//! ```text
//!                  ┌─────────────────────────────┐
//!                  │  RedeemTracker              │
//!                  │  - startup backfill         │
//!                  │  - confirmation-depth poll  │
//!                  └─────────────┬───────────────┘
//!                                │ scan sub-ranges
//!                                ▼
//!                  ┌─────────────────────────────┐
//!                  │  EthClient (eth_getLogs)    │
//!                  └─────────────┬───────────────┘
//!                                ▼ RedeemEvent
//!                  ┌─────────────────────────────┐
//!                  │  RedeemIndex                │◄── verification
//!                  │  by token / by identity     │    callbacks
//!                  └─────────────────────────────┘
//! ```
//!
//! All index writes happen on the tracker's own loop: sub-range fetches and
//! polling ticks are strictly sequential, so there is never more than one
//! writer. Verification callbacks read the shared index concurrently from
//! any thread at any point and see whatever has been recorded so far.

use crate::config::TrackerConfig;
use crate::error::TrackerResult;
use crate::eth_client::EthClient;
use crate::events::RedeemEvent;
use crate::metered_eth_provider::MeteredEthHttpProvider;
use crate::metrics::TrackerMetrics;
use crate::types::{EventFilter, TrackerState};
use ethers::providers::JsonRpcClient;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub mod index;
mod scanner;

pub use index::RedeemIndex;

pub struct RedeemTracker<P> {
    /// Source of Ethereum RPC used for redeem tracking (external or internal node)
    rpc_address: String,
    client: Arc<EthClient<P>>,
    filter: EventFilter,
    /// Maximum block span per log query; 0 means unlimited
    range_limit: u64,
    /// Highest block height fully covered by completed scans
    last_checked_height: AtomicU64,
    index: Arc<RedeemIndex>,
    state: RwLock<TrackerState>,
    cancel: CancellationToken,
    metrics: Arc<TrackerMetrics>,
}

impl RedeemTracker<MeteredEthHttpProvider> {
    /// Create a tracker for the contract and event pair in `config`.
    pub fn new(config: &TrackerConfig, metrics: Arc<TrackerMetrics>) -> anyhow::Result<Self> {
        config.validate()?;
        let filter = config.event_filter()?;
        let client = Arc::new(EthClient::new(&config.eth_rpc_url, metrics.clone())?);
        Ok(Self::with_client(
            client,
            &config.eth_rpc_url,
            filter,
            config.range_limit,
            metrics,
        ))
    }
}

impl<P> RedeemTracker<P>
where
    P: JsonRpcClient + 'static,
{
    /// Create a tracker over an existing client (tests, shared providers).
    pub fn with_client(
        client: Arc<EthClient<P>>,
        rpc_address: &str,
        filter: EventFilter,
        range_limit: u64,
        metrics: Arc<TrackerMetrics>,
    ) -> Self {
        let last_checked_height = AtomicU64::new(filter.deploy_block.saturating_sub(1));
        Self {
            rpc_address: rpc_address.to_string(),
            client,
            filter,
            range_limit,
            last_checked_height,
            index: Arc::new(RedeemIndex::new()),
            state: RwLock::new(TrackerState::Idle),
            cancel: CancellationToken::new(),
            metrics,
        }
    }

    /// Track redeem events until `stop` is called.
    ///
    /// Blocks for the tracker lifetime: one historical backfill from the
    /// contract's deploy block to the chain head, then a polling loop held
    /// back by `confirmations` blocks. A backfill error is fatal and leaves
    /// the tracker stopped without ever entering the polling state; a
    /// polling error only skips that tick.
    pub async fn start(&self, poll_interval: Duration, confirmations: u64) -> TrackerResult<()> {
        info!(
            "starting redeem tracker: rpc={}, contract={:?}, deploy_block={}, range_limit={}, confirmations={}",
            self.rpc_address,
            self.filter.contract_address,
            self.filter.deploy_block,
            self.range_limit,
            confirmations
        );
        self.set_state(TrackerState::Backfilling);
        match self.backfill().await {
            Ok(found) => {
                info!(
                    "backfill complete: {} redeems recorded up to block {}",
                    found,
                    self.last_checked_height()
                );
            }
            Err(e) => {
                error!("backfill failed, tracker will not enter polling: {:?}", e);
                self.set_state(TrackerState::Stopped);
                return Err(e);
            }
        }

        self.set_state(TrackerState::Polling);
        let mut interval = time::interval(poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("received stop signal, stopping redeem tracker");
                    break;
                }
                _ = interval.tick() => {
                    // Work runs on the tick's own control path, so ticks
                    // never overlap and index writes stay single-writer.
                    if let Err(e) = self.poll_once(confirmations).await {
                        self.metrics.err_poll_ticks.inc();
                        warn!("poll tick failed, will retry at next interval: {:?}", e);
                    }
                }
            }
        }
        self.set_state(TrackerState::Stopped);
        Ok(())
    }

    /// Signal the tracker to stop at the next tick boundary. An in-flight
    /// sub-range fetch completes before the loop observes the signal.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    async fn backfill(&self) -> TrackerResult<u64> {
        let head = self.client.get_latest_block_id().await?;
        if head < self.filter.deploy_block {
            warn!(
                "chain head {} is below deploy block {}, nothing to backfill",
                head, self.filter.deploy_block
            );
            return Ok(0);
        }
        let found = self.scan(self.filter.deploy_block, head).await?;
        self.commit_checkpoint(head);
        Ok(found)
    }

    async fn poll_once(&self, confirmations: u64) -> TrackerResult<()> {
        let head = self.client.get_latest_block_id().await?;
        let last_checked = self.last_checked_height();
        let eligible = head.saturating_sub(confirmations);
        if eligible > last_checked {
            // Start at the checkpoint itself: the one-block overlap may
            // re-fetch records the index already holds, which is tolerated.
            let found = self.scan(last_checked, eligible).await?;
            self.commit_checkpoint(eligible);
            debug!(
                "poll scanned blocks {}-{}: {} new redeems",
                last_checked, eligible, found
            );
        } else {
            debug!(
                "no new eligible blocks: head={}, confirmations={}, last_checked={}",
                head, confirmations, last_checked
            );
        }
        Ok(())
    }

    /// Scan `[from_height, to_height]` into the index, in sub-ranges of at
    /// most `range_limit + 1` blocks. Returns the number of records found.
    /// Callers resuming after an error own the resume boundary; partial
    /// progress is already in the index.
    pub async fn scan(&self, from_height: u64, to_height: u64) -> TrackerResult<u64> {
        scanner::scan_range(
            &self.client,
            &self.filter,
            &self.index,
            &self.metrics,
            self.range_limit,
            from_height,
            to_height,
        )
        .await
    }

    // Checkpoint only after the scan's writes are in the index; a reader of
    // the checkpoint must never observe coverage the index does not have.
    fn commit_checkpoint(&self, height: u64) {
        self.last_checked_height.store(height, Ordering::Release);
        self.metrics.last_checked_block.set(height as i64);
    }

    pub fn last_checked_height(&self) -> u64 {
        self.last_checked_height.load(Ordering::Acquire)
    }

    pub fn state(&self) -> TrackerState {
        *self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_state(&self, next: TrackerState) {
        *self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = next;
    }

    pub fn index(&self) -> Arc<RedeemIndex> {
        self.index.clone()
    }

    pub fn rpc_address(&self) -> &str {
        &self.rpc_address
    }

    // VERIFICATION CALLBACKS
    //
    // Read-only over the index, safe from any thread while backfilling or
    // polling runs. Used by the consensus side before it admits a validator.

    /// Whether `identity` has ever redeemed a validator pass.
    pub fn verify_membership(&self, identity: &str) -> bool {
        self.index.contains_identity(identity)
    }

    /// Whether the most recent redeem of `token_id`, as of `as_of_height`,
    /// belongs to `identity`. A later redeem by another identity supersedes
    /// an earlier one.
    pub fn verify_redeem_at_height(
        &self,
        identity: &str,
        token_id: &str,
        as_of_height: u64,
    ) -> bool {
        match self.index.latest_for_token_at(token_id, as_of_height) {
            Some(record) => record.validator_identity == identity,
            None => false,
        }
    }

    /// The most recent redeem recorded for `token_id`, if any.
    pub fn latest_for_token(&self, token_id: &str) -> Option<RedeemEvent> {
        self.index.latest_for_token(token_id)
    }

    /// The most recent redeem recorded for `identity`, if any.
    pub fn latest_for_identity(&self, identity: &str) -> Option<RedeemEvent> {
        self.index.latest_for_identity(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::providers::MockProvider;
    use ethers::types::{Log, H256, U64};

    const CONTRACT: &str = "0x8D64aB58a17dA7d8788367549c513386f09a0A70";
    const RPC: &str = "http://localhost:8545";

    fn mocked_tracker(
        deploy_block: u64,
        range_limit: u64,
    ) -> (RedeemTracker<MockProvider>, MockProvider) {
        let mock = MockProvider::new();
        let client = Arc::new(EthClient::new_mocked(mock.clone()));
        let filter = EventFilter::new(CONTRACT, "Redeemed(uint256,bytes32)", deploy_block).unwrap();
        let tracker = RedeemTracker::with_client(
            client,
            RPC,
            filter,
            range_limit,
            Arc::new(TrackerMetrics::new_for_testing()),
        );
        (tracker, mock)
    }

    fn redeem_log(token: &[u8], identity: H256, block: u64) -> Log {
        Log {
            address: CONTRACT.parse().unwrap(),
            topics: vec![H256::zero(), identity],
            data: token.to_vec().into(),
            block_number: Some(U64::from(block)),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_backfill_records_historical_redeems() {
        telemetry_subscribers::init_for_testing();
        let (tracker, mock) = mocked_tracker(100, 4);
        let identity = H256::from_low_u64_be(0xabc);

        // Backfill over [100, 112] in sub-ranges [100,104],[105,109],[110,112].
        // Mock responses pop in call order, head query first.
        mock.push::<Vec<Log>, _>(vec![]).unwrap(); // [110,112]
        mock.push::<Vec<Log>, _>(vec![redeem_log(&[0x01], identity, 107)])
            .unwrap(); // [105,109]
        mock.push::<Vec<Log>, _>(vec![]).unwrap(); // [100,104]
        mock.push(U64::from(112)).unwrap(); // head

        let found = tracker.backfill().await.unwrap();
        assert_eq!(found, 1);
        assert_eq!(tracker.last_checked_height(), 112);

        let member = format!("{:?}", identity);
        assert!(tracker.verify_membership(&member));
        assert!(!tracker.verify_membership("0xdef"));
        assert_eq!(tracker.latest_for_token("0x01").unwrap().redeemed_height, 107);
        assert_eq!(
            tracker.latest_for_identity(&member).unwrap().token_id,
            "0x01"
        );
    }

    #[tokio::test]
    async fn test_poll_respects_confirmation_depth() {
        telemetry_subscribers::init_for_testing();
        let (tracker, mock) = mocked_tracker(100, 4);
        tracker.commit_checkpoint(112);

        // head 113 with 2 confirmations: eligible 111 <= 112, no scan issued
        mock.push(U64::from(113)).unwrap();
        tracker.poll_once(2).await.unwrap();
        assert_eq!(tracker.last_checked_height(), 112);
        assert!(tracker.index().is_empty());

        // head 120: eligible 118 > 112, scan [112,118] as [112,116],[117,118]
        let identity = H256::from_low_u64_be(0xbeef);
        mock.push::<Vec<Log>, _>(vec![]).unwrap(); // [117,118]
        mock.push::<Vec<Log>, _>(vec![redeem_log(&[0x02], identity, 115)])
            .unwrap(); // [112,116]
        mock.push(U64::from(120)).unwrap(); // head
        tracker.poll_once(2).await.unwrap();

        assert_eq!(tracker.last_checked_height(), 118);
        assert!(tracker.verify_membership(&format!("{:?}", identity)));
    }

    #[tokio::test]
    async fn test_checkpoint_is_monotone_across_ticks() {
        let (tracker, mock) = mocked_tracker(100, 0);
        tracker.commit_checkpoint(200);

        // A shrinking head never moves the checkpoint backwards
        mock.push(U64::from(150)).unwrap();
        tracker.poll_once(2).await.unwrap();
        assert_eq!(tracker.last_checked_height(), 200);

        mock.push::<Vec<Log>, _>(vec![]).unwrap();
        mock.push(U64::from(250)).unwrap();
        tracker.poll_once(2).await.unwrap();
        assert_eq!(tracker.last_checked_height(), 248);
    }

    #[tokio::test]
    async fn test_failed_tick_leaves_checkpoint_untouched() {
        let (tracker, mock) = mocked_tracker(100, 4);
        tracker.commit_checkpoint(112);

        // Head query succeeds, but the scan's fetch fails: no responses left
        mock.push(U64::from(200)).unwrap();
        let err = tracker.poll_once(2).await.unwrap_err();
        assert_eq!(err.error_type(), "provider_error");
        assert_eq!(tracker.last_checked_height(), 112);
    }

    #[tokio::test]
    async fn test_re_redeem_supersedes_earlier_holder() {
        let (tracker, _mock) = mocked_tracker(100, 4);
        tracker.index().insert(RedeemEvent::new("T1", "A", 10));
        tracker.index().insert(RedeemEvent::new("T1", "B", 20));

        assert_eq!(
            tracker.latest_for_token("T1").unwrap().validator_identity,
            "B"
        );
        assert!(tracker.verify_redeem_at_height("A", "T1", 15));
        assert!(!tracker.verify_redeem_at_height("A", "T1", 25));
        assert!(tracker.verify_redeem_at_height("B", "T1", 25));
        assert!(!tracker.verify_redeem_at_height("A", "T1", 5));
        assert!(!tracker.verify_redeem_at_height("A", "T2", 25));
    }

    #[tokio::test]
    async fn test_backfill_failure_is_fatal() {
        telemetry_subscribers::init_for_testing();
        let (tracker, mock) = mocked_tracker(100, 4);
        // Head query succeeds, first sub-range fetch has no response
        mock.push(U64::from(112)).unwrap();

        let result = tracker.start(Duration::from_secs(1), 2).await;
        assert!(result.is_err());
        assert_eq!(tracker.state(), TrackerState::Stopped);
        assert_eq!(tracker.last_checked_height(), 99);
    }

    #[tokio::test]
    async fn test_backfill_skipped_when_head_below_deploy_block() {
        let (tracker, mock) = mocked_tracker(100, 4);
        mock.push(U64::from(50)).unwrap();
        let found = tracker.backfill().await.unwrap();
        assert_eq!(found, 0);
        assert_eq!(tracker.last_checked_height(), 99);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_start_stop_lifecycle() {
        telemetry_subscribers::init_for_testing();
        let (tracker, mock) = mocked_tracker(100, 0);
        mock.push::<Vec<Log>, _>(vec![]).unwrap(); // backfill [100,105]
        mock.push(U64::from(105)).unwrap(); // head

        let tracker = Arc::new(tracker);
        let handle = tokio::spawn({
            let tracker = tracker.clone();
            async move { tracker.start(Duration::from_secs(60), 2).await }
        });

        // Let backfill and a couple of (failing) poll ticks run
        time::sleep(Duration::from_secs(150)).await;
        assert_eq!(tracker.state(), TrackerState::Polling);
        assert_eq!(tracker.last_checked_height(), 105);

        tracker.stop();
        handle.await.unwrap().unwrap();
        assert_eq!(tracker.state(), TrackerState::Stopped);
    }
}
