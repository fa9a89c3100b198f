// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Run profiling metrics.
//!
//! [`RunMetrics`] collects per-operator wall time (when profiling is enabled)
//! and the arena's memory footprint for one [`crate::Executor::run`].

use std::time::Duration;

use crate::OpKind;

/// Timing of one operator in a run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct OpMetrics {
    /// Position of the operator in the graph.
    pub index: usize,
    /// Operator kind.
    pub op: OpKind,
    /// Wall time of the run routine.
    pub duration: Duration,
}

/// Aggregate metrics of one graph run.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct RunMetrics {
    /// Wall-clock time of the whole run.
    pub total_duration: Duration,
    /// Number of operators executed.
    pub ops_executed: usize,
    /// Per-operator timings; empty when profiling is off.
    pub op_metrics: Vec<OpMetrics>,
    /// Bytes held by the arena after the run.
    pub arena_bytes: usize,
    /// Arena high-water mark.
    pub peak_bytes: usize,
}

impl RunMetrics {
    /// Creates an empty metrics container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one operator's timing.
    pub fn record_op(&mut self, index: usize, op: OpKind, duration: Duration) {
        self.op_metrics.push(OpMetrics { index, op, duration });
    }

    /// Finalises metrics with the totals of the run.
    pub fn finalise(&mut self, total: Duration, ops_executed: usize, arena_bytes: usize, peak_bytes: usize) {
        self.total_duration = total;
        self.ops_executed = ops_executed;
        self.arena_bytes = arena_bytes;
        self.peak_bytes = peak_bytes;
    }

    /// Returns the slowest recorded operator.
    pub fn slowest(&self) -> Option<&OpMetrics> {
        self.op_metrics.iter().max_by_key(|m| m.duration)
    }

    /// Returns a one-line human-readable summary.
    pub fn summary(&self) -> String {
        let slowest = match self.slowest() {
            Some(m) => format!(
                ", slowest #{} {} {:.3}ms",
                m.index,
                m.op,
                m.duration.as_secs_f64() * 1000.0
            ),
            None => String::new(),
        };
        format!(
            "Run: {:.3}ms, {} ops, arena {:.2} KB (peak {:.2} KB){slowest}",
            self.total_duration.as_secs_f64() * 1000.0,
            self.ops_executed,
            self.arena_bytes as f64 / 1024.0,
            self.peak_bytes as f64 / 1024.0,
        )
    }
}
