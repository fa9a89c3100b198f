// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Allocation statistics for the arena.

/// Cumulative counters over every [`crate::TensorArena::allocate`] request.
///
/// Repeated prepares of the same graph show up as `unchanged` requests, which
/// is the quickest way to confirm allocation is idempotent in practice.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct AllocationStats {
    /// Total allocation requests, including failed ones.
    pub requests: u64,
    /// Requests that materialised a fresh buffer.
    pub fresh: u64,
    /// Requests that found a correctly sized buffer and kept it.
    pub unchanged: u64,
    /// Requests rejected by the memory budget.
    pub oom_count: u64,
    /// High-water mark of bytes held by all buffers.
    pub peak_bytes: usize,
    /// Sum of the sizes of every fresh buffer.
    pub cumulative_bytes: u64,
}

impl AllocationStats {
    /// Fraction of successful requests that were no-ops, in `[0.0, 1.0]`.
    pub fn unchanged_ratio(&self) -> f64 {
        let served = self.fresh + self.unchanged;
        if served == 0 {
            return 0.0;
        }
        self.unchanged as f64 / served as f64
    }

    pub(crate) fn record_fresh(&mut self, bytes: usize, held_bytes: usize) {
        self.requests += 1;
        self.fresh += 1;
        self.cumulative_bytes += bytes as u64;
        self.peak_bytes = self.peak_bytes.max(held_bytes);
    }

    pub(crate) fn record_unchanged(&mut self) {
        self.requests += 1;
        self.unchanged += 1;
    }

    pub(crate) fn record_oom(&mut self) {
        self.requests += 1;
        self.oom_count += 1;
    }

    /// Returns a one-line human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "Allocations: {} requests ({} fresh, {} unchanged), {} OOMs, peak {:.2} KB, {:.2} KB cumulative",
            self.requests,
            self.fresh,
            self.unchanged,
            self.oom_count,
            self.peak_bytes as f64 / 1024.0,
            self.cumulative_bytes as f64 / 1024.0,
        )
    }
}
