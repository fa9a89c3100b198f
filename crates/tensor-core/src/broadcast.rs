// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Broadcasting index resolution.
//!
//! An operand is broadcast against an output shape by right-aligning its
//! dimensions and treating missing leading dimensions as 1. A unit operand
//! dimension always contributes coordinate 0, so the operand's linear index
//! for an output element is
//!
//! ```text
//! Σ_d  (operand_dim[d] == 1 ? 0 : coord[d]) * operand_stride[d]
//! ```
//!
//! where `coord` is the output element's coordinate vector. This is the
//! O(rank)-per-element fallback every specialised kernel path must agree with.

use crate::shape::{Dims, Shape};
use crate::TensorError;

/// Maps output linear indices to operand linear indices for one operand.
///
/// The per-dimension operand strides are computed once, with 0 in every
/// position the operand broadcasts over.
#[derive(Debug, Clone)]
pub struct BroadcastIndexer {
    out_dims: Dims,
    strides: Dims,
}

impl BroadcastIndexer {
    /// Builds an indexer for `operand` against `output`.
    ///
    /// # Errors
    /// Returns [`TensorError::NotBroadcastable`] if `operand` does not
    /// broadcast to `output`.
    pub fn new(output: &Shape, operand: &Shape) -> Result<Self, TensorError> {
        let not_broadcastable = || TensorError::NotBroadcastable {
            operand: operand.clone(),
            target: output.clone(),
        };
        if !operand.broadcasts_to(output) {
            return Err(not_broadcastable());
        }
        let aligned = operand
            .aligned_to(output.rank())
            .ok_or_else(not_broadcastable)?;
        let dense = aligned.strides();
        let strides = aligned
            .dims()
            .iter()
            .zip(dense.iter())
            .map(|(&d, &s)| if d == 1 { 0 } else { s })
            .collect();
        Ok(Self {
            out_dims: output.dims().into(),
            strides,
        })
    }

    /// Returns the operand index feeding output element `linear`.
    #[inline]
    pub fn index(&self, linear: usize) -> usize {
        let mut rem = linear;
        let mut idx = 0;
        for (&dim, &stride) in self.out_dims.iter().zip(self.strides.iter()).rev() {
            idx += (rem % dim) * stride;
            rem /= dim;
        }
        idx
    }

    /// Returns `true` when the operand is not broadcast in any dimension.
    pub fn is_identity(&self) -> bool {
        let mut expected = 1;
        for (&dim, &stride) in self.out_dims.iter().zip(self.strides.iter()).rev() {
            if dim != 1 && stride != expected {
                return false;
            }
            expected *= dim;
        }
        true
    }
}

/// Resolves the operand index for output element `linear`.
///
/// Convenience wrapper over [`BroadcastIndexer`] for one-off lookups.
///
/// ```
/// use tensor_core::{broadcast::resolve_index, Shape};
/// let out = Shape::new(vec![2, 3]);
/// let row = Shape::new(vec![3]);
/// let col = Shape::new(vec![2, 1]);
/// assert_eq!(resolve_index(4, &out, &row).unwrap(), 1);
/// assert_eq!(resolve_index(4, &out, &col).unwrap(), 1);
/// ```
pub fn resolve_index(linear: usize, output: &Shape, operand: &Shape) -> Result<usize, TensorError> {
    Ok(BroadcastIndexer::new(output, operand)?.index(linear))
}
