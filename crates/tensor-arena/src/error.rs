// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the tensor arena.

use crate::TensorId;
use tensor_core::TensorError;

/// Errors that can occur while managing arena tensors.
#[derive(Debug, thiserror::Error)]
pub enum ArenaError {
    /// Materialising a buffer would exceed the memory budget.
    #[error("out of memory allocating {tensor}: requested {requested_bytes} bytes, but only {available_bytes} available (budget: {budget_bytes})")]
    OutOfMemory {
        tensor: TensorId,
        requested_bytes: usize,
        available_bytes: usize,
        budget_bytes: usize,
    },

    /// The id does not name a tensor in this arena.
    #[error("unknown tensor {0}")]
    UnknownTensor(TensorId),

    /// A tensor was requested as both a read-only input and the output.
    #[error("tensor {0} is used as both input and output")]
    AliasedOutput(TensorId),

    /// A budget string could not be parsed.
    #[error("invalid memory budget '{0}': expected a positive number with an optional K, M or G suffix")]
    InvalidBudget(String),

    /// A tensor-level error surfaced through the arena.
    #[error(transparent)]
    Tensor(#[from] TensorError),
}
