// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Hard-swish activation.

use crate::{DType, Tensor, TensorError};

/// Applies hard-swish element-wise:
///
/// `hswish(x) = x * min(max(x + 3, 0), 6) / 6`
///
/// # Errors
/// Returns [`TensorError::UnsupportedDType`] if either tensor is not `F32`.
/// Returns [`TensorError::ShapeMismatch`] if the element counts differ.
pub fn hard_swish(input: &Tensor, output: &mut Tensor) -> Result<(), TensorError> {
    for dtype in [input.dtype(), output.dtype()] {
        if dtype != DType::F32 {
            return Err(TensorError::UnsupportedDType {
                op: "hswish",
                dtype,
            });
        }
    }

    if input.num_elements() != output.num_elements() {
        return Err(TensorError::ShapeMismatch {
            op: "hswish",
            lhs: input.shape().clone(),
            rhs: output.shape().clone(),
        });
    }

    let src = input.as_slice::<f32>()?;
    let dst = output.as_slice_mut::<f32>()?;

    for (d, &x) in dst.iter_mut().zip(src) {
        *d = hard_swish_scalar(x);
    }

    Ok(())
}

/// Computes hard-swish for a single f32 value.
///
/// A NaN input yields NaN; `-inf` yields NaN (`-inf * 0`).
#[inline(always)]
pub fn hard_swish_scalar(x: f32) -> f32 {
    let r = x + 3.0;
    let r = if r > 0.0 { r } else { 0.0 };
    let r = if r < 6.0 { r } else { 6.0 };
    x * r / 6.0
}
