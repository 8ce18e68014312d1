// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric recording helpers.
//!
//! Thin wrappers over the `metrics` macros so call sites stay tidy. With no
//! recorder installed these are no-ops.

use metrics::{describe_counter, describe_gauge};

/// Registers metric descriptions. Call once at startup.
pub fn describe_metrics() {
    describe_counter!("tether_turns_in_total", "Inbound conversation turns");
    describe_counter!("tether_turns_out_total", "Outbound conversation turns");
    describe_gauge!("tether_active_workers", "Per-user worker tasks alive");
}

pub(crate) fn record_turn_in() {
    metrics::counter!("tether_turns_in_total").increment(1);
}

pub(crate) fn record_turn_out() {
    metrics::counter!("tether_turns_out_total").increment(1);
}

pub(crate) fn set_active_workers(count: f64) {
    metrics::gauge!("tether_active_workers").set(count);
}
