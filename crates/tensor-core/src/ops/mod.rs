// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Element-wise CPU kernels.
//!
//! Every kernel writes into a caller-provided, already allocated output
//! tensor and never allocates in the element loop.

mod add_div_clip_cast_op;
mod cast_op;
mod hswish_op;

pub use add_div_clip_cast_op::{
    add_div_clip_cast, broadcast_output_shape, AddDivClip, BroadcastStrategy, FusedArith, Operand,
};
pub use cast_op::{cast, cast_slice};
pub use hswish_op::{hard_swish, hard_swish_scalar};
