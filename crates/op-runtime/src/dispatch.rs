// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Static (input dtype, output dtype) → routine tables.
//!
//! Dtypes arrive at runtime from the graph, but kernels are generic over
//! element types. Each operator kind lists the pairs it supports with one
//! monomorphised [`RunFn`] per pair; prepare looks the pair up once and the
//! hot loop never branches on dtype.

use std::fmt;

use tensor_core::DType;
use tracing::warn;

use crate::{OpError, OpKind, RunFn};

/// One supported dtype pairing.
#[derive(Clone, Copy)]
pub struct DispatchEntry {
    /// Dtype shared by the operator's inputs.
    pub input: DType,
    /// Dtype written to the output.
    pub output: DType,
    /// Routine monomorphised for this pairing.
    pub run: RunFn,
}

impl fmt::Debug for DispatchEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.input, self.output)
    }
}

/// The fixed set of dtype pairings of one operator kind.
#[derive(Debug)]
pub struct DispatchTable {
    op: OpKind,
    entries: &'static [DispatchEntry],
}

impl DispatchTable {
    /// Builds a table; used to define the per-kind statics.
    pub const fn new(op: OpKind, entries: &'static [DispatchEntry]) -> Self {
        Self { op, entries }
    }

    /// Returns the operator kind this table belongs to.
    pub fn op(&self) -> OpKind {
        self.op
    }

    /// Returns every supported pairing.
    pub fn entries(&self) -> &'static [DispatchEntry] {
        self.entries
    }

    /// Returns `true` if `input -> output` has a routine.
    pub fn supports(&self, input: DType, output: DType) -> bool {
        self.find(input, output).is_some()
    }

    /// Selects the routine for `input -> output`.
    ///
    /// # Errors
    /// [`OpError::UnsupportedDTypes`] if the pair is not in the table.
    pub fn lookup(&self, input: DType, output: DType) -> Result<RunFn, OpError> {
        match self.find(input, output) {
            Some(entry) => Ok(entry.run),
            None => {
                warn!(
                    op = %self.op,
                    %input,
                    %output,
                    supported = ?self.entries,
                    "no routine for dtype pair"
                );
                Err(OpError::UnsupportedDTypes {
                    op: self.op,
                    input,
                    output,
                })
            }
        }
    }

    fn find(&self, input: DType, output: DType) -> Option<&'static DispatchEntry> {
        self.entries
            .iter()
            .find(|e| e.input == input && e.output == output)
    }
}

/// Returns the dispatch table of `op`.
pub fn table_for(op: OpKind) -> &'static DispatchTable {
    match op {
        OpKind::AddDivClipCast => &crate::ops::ADD_DIV_CLIP_CAST_TABLE,
        OpKind::Cast => &crate::ops::CAST_TABLE,
        OpKind::HSwish => &crate::ops::HSWISH_TABLE,
    }
}
