// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Hard-swish operator. f32 only; no settings.

use tensor_arena::TensorArena;
use tensor_core::{hard_swish, DType};
use tracing::debug;

use super::allocate_inputs;
use crate::dispatch::{DispatchEntry, DispatchTable};
use crate::{OpError, OpIo, OpKind, OpSettings, Operator, RunFn};

const KIND: OpKind = OpKind::HSwish;

/// Supported `input -> output` pairs.
pub static HSWISH_TABLE: DispatchTable = DispatchTable::new(
    KIND,
    &[DispatchEntry {
        input: DType::F32,
        output: DType::F32,
        run: run_f32,
    }],
);

#[derive(Debug, Default)]
pub struct HSwishOp;

impl Operator for HSwishOp {
    fn kind(&self) -> OpKind {
        KIND
    }

    fn config(&mut self, _settings: &OpSettings) -> Result<(), OpError> {
        Ok(())
    }

    fn prepare(&self, arena: &mut TensorArena, io: &OpIo) -> Result<RunFn, OpError> {
        io.check_arity(KIND, 1, 1)?;
        io.check_aliasing()?;

        allocate_inputs(arena, io)?;
        let input = arena.get(io.inputs()[0])?;
        let (shape, dtype) = (input.shape().clone(), input.dtype());
        let run = HSWISH_TABLE.lookup(dtype, dtype)?;

        let output = io.output()?;
        debug!(op = %KIND, %dtype, %shape, "bound routine");
        arena.set_shape(output, shape)?;
        arena.set_dtype(output, dtype)?;
        arena.allocate(output)?;
        Ok(run)
    }
}

fn run_f32(io: &OpIo, arena: &mut TensorArena) -> Result<(), OpError> {
    let (inputs, output) = arena.split_io(io.inputs(), io.output()?)?;
    hard_swish(inputs[0], output)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OpInstance;
    use tensor_core::{Shape, Tensor};

    #[test]
    fn test_hswish_operator() {
        let mut arena = TensorArena::default();
        let x = arena
            .insert(Tensor::from_slice(Shape::nchw(1, 1, 2, 2), &[-3.0f32, 0.0, 3.0, 6.0]).unwrap())
            .unwrap();
        let y = arena.declare(Shape::scalar(), DType::F32);
        let op = OpInstance::new(Box::new(HSwishOp), OpIo::new(&[x], &[y]))
            .config(&OpSettings::new())
            .unwrap()
            .prepare(&mut arena)
            .unwrap();
        op.run(&mut arena).unwrap();

        assert_eq!(arena.get(y).unwrap().shape(), &Shape::nchw(1, 1, 2, 2));
        assert_eq!(arena.read::<f32>(y).unwrap(), &[0.0, 0.0, 3.0, 6.0]);
    }

    #[test]
    fn test_non_f32_rejected() {
        let mut arena = TensorArena::default();
        let x = arena.insert(Tensor::zeros(Shape::vector(2), DType::I32)).unwrap();
        let y = arena.declare(Shape::vector(2), DType::I32);
        assert!(matches!(
            HSwishOp.prepare(&mut arena, &OpIo::new(&[x], &[y])),
            Err(OpError::UnsupportedDTypes { op: OpKind::HSwish, .. })
        ));
    }

    #[test]
    fn test_two_outputs_rejected() {
        let mut arena = TensorArena::default();
        let x = arena.insert(Tensor::zeros(Shape::vector(2), DType::F32)).unwrap();
        let y = arena.declare(Shape::vector(2), DType::F32);
        let z = arena.declare(Shape::vector(2), DType::F32);
        assert!(matches!(
            HSwishOp.prepare(&mut arena, &OpIo::new(&[x], &[y, z])),
            Err(OpError::Arity { outputs: 2, .. })
        ));
    }
}
