// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The operator kinds of the CPU backend.

mod add_div_clip_cast;
mod cast;
mod hswish;

pub use add_div_clip_cast::{AddDivClipCastOp, ADD_DIV_CLIP_CAST_TABLE};
pub use cast::{CastOp, CAST_TABLE};
pub use hswish::{HSwishOp, HSWISH_TABLE};

use tensor_arena::TensorArena;

use crate::{OpError, OpIo};

/// Materialises every input buffer; already sized buffers are kept.
fn allocate_inputs(arena: &mut TensorArena, io: &OpIo) -> Result<(), OpError> {
    for &id in io.inputs() {
        arena.allocate(id)?;
    }
    Ok(())
}
