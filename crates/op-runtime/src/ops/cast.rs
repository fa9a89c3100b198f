// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Cast operator: one input, one output of the same shape, output dtype
//! taken from the `CAST_DTYPE` setting.

use tensor_arena::TensorArena;
use tensor_core::{cast, DType, Element, NativeCast};
use tracing::debug;

use super::allocate_inputs;
use crate::dispatch::{DispatchEntry, DispatchTable};
use crate::{OpError, OpIo, OpKind, OpSettings, Operator, RunFn, SettingKey};

const KIND: OpKind = OpKind::Cast;

macro_rules! cast_entries {
    ($(($src:ty, $src_dtype:ident) => ($dst:ty, $dst_dtype:ident)),* $(,)?) => {
        &[$(
            DispatchEntry {
                input: DType::$src_dtype,
                output: DType::$dst_dtype,
                run: run::<$src, $dst>,
            }
        ),*]
    };
}

/// Supported `input -> output` pairs.
pub static CAST_TABLE: DispatchTable = DispatchTable::new(
    KIND,
    cast_entries![
        (f32, F32) => (u8, U8),
        (i64, I64) => (f32, F32),
        (f32, F32) => (i64, I64),
        (i32, I32) => (u8, U8),
        (f32, F32) => (f32, F32),
        (i64, I64) => (i64, I64),
        (i32, I32) => (i8, I8),
    ],
);

#[derive(Debug, Default)]
pub struct CastOp {
    target: Option<DType>,
}

impl Operator for CastOp {
    fn kind(&self) -> OpKind {
        KIND
    }

    fn config(&mut self, settings: &OpSettings) -> Result<(), OpError> {
        self.target = Some(settings.get_dtype(SettingKey::CAST_DTYPE)?);
        Ok(())
    }

    fn prepare(&self, arena: &mut TensorArena, io: &OpIo) -> Result<RunFn, OpError> {
        io.check_arity(KIND, 1, 1)?;
        io.check_aliasing()?;
        let target = self.target.ok_or(OpError::MissingSetting {
            key: SettingKey::CAST_DTYPE,
        })?;

        allocate_inputs(arena, io)?;
        let input = arena.get(io.inputs()[0])?;
        let (shape, input_dtype) = (input.shape().clone(), input.dtype());
        let run = CAST_TABLE.lookup(input_dtype, target)?;

        let output = io.output()?;
        debug!(op = %KIND, %input_dtype, output_dtype = %target, %shape, "bound routine");
        arena.set_shape(output, shape)?;
        arena.set_dtype(output, target)?;
        arena.allocate(output)?;
        Ok(run)
    }
}

fn run<S, D>(io: &OpIo, arena: &mut TensorArena) -> Result<(), OpError>
where
    S: Element + NativeCast<D>,
    D: Element,
{
    let (inputs, output) = arena.split_io(io.inputs(), io.output()?)?;
    cast::<S, D>(inputs[0], output)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{OpInstance, Prepared, SettingValue};
    use tensor_arena::TensorId;
    use tensor_core::{Shape, Tensor};

    fn prepared_cast(
        arena: &mut TensorArena,
        input: Tensor,
        target: DType,
    ) -> Result<(OpInstance<Prepared>, TensorId), OpError> {
        let src = arena.insert(input)?;
        let dst = arena.declare(Shape::scalar(), DType::F32);
        let settings =
            OpSettings::new().with(SettingKey::CAST_DTYPE, SettingValue::DType(target));
        let op = OpInstance::new(Box::<CastOp>::default(), OpIo::new(&[src], &[dst]))
            .config(&settings)?
            .prepare(arena)?;
        Ok((op, dst))
    }

    #[test]
    fn test_f32_to_u8_wraps() {
        let mut arena = TensorArena::default();
        let input = Tensor::from_slice(Shape::new(vec![2, 2]), &[0.5f32, 255.9, 300.7, -1.0]).unwrap();
        let (op, out) = prepared_cast(&mut arena, input, DType::U8).unwrap();
        op.run(&mut arena).unwrap();

        let produced = arena.get(out).unwrap();
        assert_eq!(produced.shape(), &Shape::new(vec![2, 2]));
        assert_eq!(produced.to_vec::<u8>().unwrap(), vec![0, 255, 44, 255]);
    }

    #[test]
    fn test_every_listed_pair_prepares() {
        for entry in CAST_TABLE.entries() {
            let mut arena = TensorArena::default();
            let input = Tensor::zeros(Shape::vector(3), entry.input);
            let (op, out) = prepared_cast(&mut arena, input, entry.output).unwrap();
            op.run(&mut arena).unwrap();
            assert_eq!(arena.get(out).unwrap().dtype(), entry.output);
        }
    }

    #[test]
    fn test_unsupported_pair() {
        let mut arena = TensorArena::default();
        let input = Tensor::zeros(Shape::vector(3), DType::U8);
        assert!(matches!(
            prepared_cast(&mut arena, input, DType::F32),
            Err(OpError::UnsupportedDTypes {
                op: OpKind::Cast,
                input: DType::U8,
                output: DType::F32
            })
        ));
    }

    #[test]
    fn test_rank0_input() {
        let mut arena = TensorArena::default();
        let input = Tensor::from_slice(Shape::scalar(), &[-7i32]).unwrap();
        let (op, out) = prepared_cast(&mut arena, input, DType::I8).unwrap();
        op.run(&mut arena).unwrap();
        assert_eq!(arena.read::<i8>(out).unwrap(), &[-7]);
    }
}
