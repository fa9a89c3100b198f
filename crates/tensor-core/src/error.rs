// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for tensor operations.

use crate::{BroadcastStrategy, DType, Shape};

/// Errors that can occur during tensor operations.
#[derive(Debug, thiserror::Error)]
pub enum TensorError {
    /// The provided buffer size does not match the expected size for the given shape and dtype.
    #[error("shape mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// Two tensors have incompatible shapes for the requested operation.
    #[error("incompatible shapes for {op}: {lhs} vs {rhs}")]
    ShapeMismatch {
        op: &'static str,
        lhs: Shape,
        rhs: Shape,
    },

    /// An operand cannot be broadcast to the target shape.
    #[error("operand shape {operand} does not broadcast to {target}")]
    NotBroadcastable { operand: Shape, target: Shape },

    /// The requested data type is not supported for this operation.
    #[error("unsupported dtype {dtype} for operation {op}")]
    UnsupportedDType { op: &'static str, dtype: DType },

    /// The buffer was accessed with an element type that differs from its tag.
    #[error("dtype mismatch: tensor holds {actual}, accessed as {expected}")]
    DTypeMismatch { expected: DType, actual: DType },

    /// The buffer was read before it was allocated.
    #[error("tensor buffer of shape {shape} is not allocated")]
    NotAllocated { shape: Shape },

    /// A kernel received the wrong number of operands.
    #[error("{op} expects {expected} operands, got {actual}")]
    OperandCount {
        op: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A clamp bound tensor holds no elements.
    #[error("clip bound '{bound}' has no elements")]
    EmptyClipBound { bound: &'static str },

    /// A forced broadcasting strategy does not fit the operand shapes.
    #[error("broadcast strategy {strategy:?} cannot handle these operand shapes")]
    StrategyNotApplicable { strategy: BroadcastStrategy },
}
