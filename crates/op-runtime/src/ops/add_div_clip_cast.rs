// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Fused add/divide/clip/cast operator.
//!
//! Inputs: `[a, addend, divisor, min, max]`, all of one dtype. The output
//! dtype comes from the `CAST_DTYPE` setting; the output shape is the
//! broadcast of `a`, `addend` and `divisor`.

use tensor_arena::TensorArena;
use tensor_core::{
    add_div_clip_cast, broadcast_output_shape, DType, Element, FusedArith, NativeCast, TensorError,
};
use tracing::{debug, trace};

use super::allocate_inputs;
use crate::dispatch::{DispatchEntry, DispatchTable};
use crate::{OpError, OpIo, OpKind, OpSettings, Operator, RunFn, SettingKey};

const KIND: OpKind = OpKind::AddDivClipCast;

/// Supported `input -> output` pairs.
pub static ADD_DIV_CLIP_CAST_TABLE: DispatchTable = DispatchTable::new(
    KIND,
    &[
        DispatchEntry {
            input: DType::F32,
            output: DType::U8,
            run: run::<f32, u8>,
        },
        DispatchEntry {
            input: DType::I32,
            output: DType::U8,
            run: run::<i32, u8>,
        },
        DispatchEntry {
            input: DType::I32,
            output: DType::I8,
            run: run::<i32, i8>,
        },
    ],
);

/// Configured state: the target dtype.
#[derive(Debug, Default)]
pub struct AddDivClipCastOp {
    output_dtype: Option<DType>,
}

impl Operator for AddDivClipCastOp {
    fn kind(&self) -> OpKind {
        KIND
    }

    fn config(&mut self, settings: &OpSettings) -> Result<(), OpError> {
        self.output_dtype = Some(settings.get_dtype(SettingKey::CAST_DTYPE)?);
        Ok(())
    }

    fn prepare(&self, arena: &mut TensorArena, io: &OpIo) -> Result<RunFn, OpError> {
        io.check_arity(KIND, 5, 1)?;
        io.check_aliasing()?;
        let output_dtype = self.output_dtype.ok_or(OpError::MissingSetting {
            key: SettingKey::CAST_DTYPE,
        })?;

        allocate_inputs(arena, io)?;
        let inputs = io.inputs();
        let input_dtype = arena.get(inputs[0])?.dtype();
        for &id in &inputs[1..] {
            let actual = arena.get(id)?.dtype();
            if actual != input_dtype {
                return Err(TensorError::DTypeMismatch {
                    expected: input_dtype,
                    actual,
                }
                .into());
            }
        }
        let run = ADD_DIV_CLIP_CAST_TABLE.lookup(input_dtype, output_dtype)?;

        let out_shape = broadcast_output_shape(
            arena.get(inputs[0])?.shape(),
            arena.get(inputs[1])?.shape(),
            arena.get(inputs[2])?.shape(),
        )
        .map_err(|source| OpError::IncompatibleShapes { op: KIND, source })?;
        for (id, bound) in [(inputs[3], "min"), (inputs[4], "max")] {
            if arena.get(id)?.num_elements() == 0 {
                return Err(TensorError::EmptyClipBound { bound }.into());
            }
        }

        let output = io.output()?;
        debug!(op = %KIND, %input_dtype, %output_dtype, shape = %out_shape, "bound routine");
        arena.set_shape(output, out_shape)?;
        arena.set_dtype(output, output_dtype)?;
        arena.allocate(output)?;
        Ok(run)
    }
}

fn run<T, D>(io: &OpIo, arena: &mut TensorArena) -> Result<(), OpError>
where
    T: FusedArith + NativeCast<D>,
    D: Element,
{
    let (inputs, output) = arena.split_io(io.inputs(), io.output()?)?;
    let strategy = add_div_clip_cast::<T, D>(&inputs, output)?;
    trace!(strategy = strategy.as_str(), "add_div_clip_cast");
    Ok(())
}
