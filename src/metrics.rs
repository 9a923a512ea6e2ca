// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use prometheus::{
    register_histogram_vec_with_registry, register_int_counter_vec_with_registry,
    register_int_counter_with_registry, register_int_gauge_with_registry, HistogramVec,
    IntCounter, IntCounterVec, IntGauge, Registry,
};

const FINE_GRAINED_LATENCY_SEC_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.05, 0.1, 0.15, 0.2, 0.25, 0.3, 0.4, 0.5, 0.6, 0.8, 1.0, 1.5, 2.0, 2.5,
    3.0, 4.0, 5.0, 7.5, 10., 15., 20., 30., 45., 60.,
];

#[derive(Clone, Debug)]
pub struct TrackerMetrics {
    pub(crate) eth_rpc_queries: IntCounterVec,
    pub(crate) eth_rpc_queries_latency: HistogramVec,
    pub(crate) eth_node_connected: IntGauge,

    pub(crate) last_checked_block: IntGauge,
    pub(crate) backfill_progress_percent: IntGauge,
    pub(crate) redeem_events_recorded: IntCounter,
    pub(crate) err_poll_ticks: IntCounter,
}

impl TrackerMetrics {
    pub fn new(registry: &Registry) -> Self {
        Self {
            eth_rpc_queries: register_int_counter_vec_with_registry!(
                "tracker_eth_rpc_queries",
                "Total number of Ethereum RPC queries by method",
                &["method"],
                registry,
            )
            .unwrap(),
            eth_rpc_queries_latency: register_histogram_vec_with_registry!(
                "tracker_eth_rpc_queries_latency",
                "Latency of Ethereum RPC queries by method",
                &["method"],
                FINE_GRAINED_LATENCY_SEC_BUCKETS.to_vec(),
                registry,
            )
            .unwrap(),
            eth_node_connected: register_int_gauge_with_registry!(
                "tracker_eth_node_connected",
                "Whether the last Ethereum RPC request succeeded (1) or failed (0)",
                registry,
            )
            .unwrap(),
            last_checked_block: register_int_gauge_with_registry!(
                "tracker_last_checked_block",
                "Highest block height fully covered by completed scans",
                registry,
            )
            .unwrap(),
            backfill_progress_percent: register_int_gauge_with_registry!(
                "tracker_backfill_progress_percent",
                "Progress of the current scan through its block interval",
                registry,
            )
            .unwrap(),
            redeem_events_recorded: register_int_counter_with_registry!(
                "tracker_redeem_events_recorded",
                "Total number of redeem events recorded in the index",
                registry,
            )
            .unwrap(),
            err_poll_ticks: register_int_counter_with_registry!(
                "tracker_err_poll_ticks",
                "Number of polling ticks that failed and were skipped",
                registry,
            )
            .unwrap(),
        }
    }

    pub fn new_for_testing() -> Self {
        Self::new(&Registry::new())
    }
}
