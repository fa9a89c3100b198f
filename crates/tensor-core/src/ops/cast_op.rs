// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Element-wise type conversion.

use crate::{Element, NativeCast, Tensor, TensorError};

/// Converts every element of `input` from `S` to `D` into `output`.
///
/// The conversion follows [`NativeCast`]: float to integer truncates toward
/// zero and wraps into the destination width; everything else is a plain
/// numeric conversion. Shapes may differ as long as the element counts match.
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] if the element counts differ, and
/// the usual dtype/allocation errors from the typed slice accessors.
pub fn cast<S, D>(input: &Tensor, output: &mut Tensor) -> Result<(), TensorError>
where
    S: Element + NativeCast<D>,
    D: Element,
{
    if input.num_elements() != output.num_elements() {
        return Err(TensorError::ShapeMismatch {
            op: "cast",
            lhs: input.shape().clone(),
            rhs: output.shape().clone(),
        });
    }

    cast_slice(input.as_slice::<S>()?, output.as_slice_mut::<D>()?);
    Ok(())
}

/// Converts `src` into `dst` element by element.
///
/// Only the common prefix of the two slices is written.
#[inline]
pub fn cast_slice<S: NativeCast<D>, D>(src: &[S], dst: &mut [D]) {
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = s.native_cast();
    }
}
