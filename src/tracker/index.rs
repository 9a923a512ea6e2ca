// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! In-memory store of observed redeem events.

use crate::events::RedeemEvent;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Every redeem a tracker has observed, plus lookup structures by token id
/// and by validator identity.
///
/// The flat sequence is append-only and insertion-ordered. The two lookup
/// maps hold positions into it and are extended in the same insert call, so
/// they can never drift from the sequence they cache. Nothing is ever
/// deleted.
///
/// No de-duplication happens at insert time: overlapping re-scans may record
/// the same on-chain event twice, and every query stays correct under
/// duplication.
pub struct RedeemIndex {
    inner: RwLock<IndexInner>,
}

#[derive(Default)]
struct IndexInner {
    records: Vec<RedeemEvent>,
    by_token: HashMap<String, Vec<usize>>,
    by_identity: HashMap<String, Vec<usize>>,
}

impl RedeemIndex {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(IndexInner::default()),
        }
    }

    /// Append a record to the flat sequence and both lookup maps.
    pub fn insert(&self, record: RedeemEvent) {
        let mut inner = self.write();
        let position = inner.records.len();
        inner
            .by_token
            .entry(record.token_id.clone())
            .or_default()
            .push(position);
        inner
            .by_identity
            .entry(record.validator_identity.clone())
            .or_default()
            .push(position);
        inner.records.push(record);
    }

    /// The most recent redeem of a token: maximum height, ties going to the
    /// latest inserted record. A re-redeem supersedes earlier ones.
    pub fn latest_for_token(&self, token_id: &str) -> Option<RedeemEvent> {
        self.latest_for_token_at(token_id, u64::MAX)
    }

    /// The most recent redeem of a token among records at or below
    /// `as_of_height`.
    pub fn latest_for_token_at(&self, token_id: &str, as_of_height: u64) -> Option<RedeemEvent> {
        let inner = self.read();
        latest_at(&inner, inner.by_token.get(token_id)?, as_of_height)
    }

    /// The most recent redeem recorded under a validator identity.
    pub fn latest_for_identity(&self, identity: &str) -> Option<RedeemEvent> {
        let inner = self.read();
        latest_at(&inner, inner.by_identity.get(identity)?, u64::MAX)
    }

    /// Whether any redeem has ever been recorded for this identity.
    pub fn contains_identity(&self, identity: &str) -> bool {
        self.read().by_identity.contains_key(identity)
    }

    /// Number of records in the flat sequence, duplicates included.
    pub fn len(&self) -> usize {
        self.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().records.is_empty()
    }

    /// Snapshot of the flat sequence in insertion order.
    pub fn records(&self) -> Vec<RedeemEvent> {
        self.read().records.clone()
    }

    // The structure is append-only, so a poisoned lock still holds
    // consistent data and can be taken over.
    fn read(&self) -> RwLockReadGuard<'_, IndexInner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexInner> {
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for RedeemIndex {
    fn default() -> Self {
        Self::new()
    }
}

// Positions are in insertion order, so `>=` keeps the latest inserted record
// when heights tie.
fn latest_at(
    inner: &IndexInner,
    positions: &[usize],
    as_of_height: u64,
) -> Option<RedeemEvent> {
    let mut best: Option<&RedeemEvent> = None;
    for &position in positions {
        let record = &inner.records[position];
        if record.redeemed_height > as_of_height {
            continue;
        }
        if best.map_or(true, |current| record.redeemed_height >= current.redeemed_height) {
            best = Some(record);
        }
    }
    best.cloned()
}
