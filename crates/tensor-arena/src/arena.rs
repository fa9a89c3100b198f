// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The arena: a tensor table addressed by stable indices.

use std::fmt;

use smallvec::SmallVec;
use tensor_core::{Allocation, DType, Element, Shape, Tensor};
use tracing::{trace, warn};

use crate::{AllocationStats, ArenaError, MemoryBudget};

/// Stable index of a tensor inside one [`TensorArena`].
///
/// Ids are handed out in insertion order and are never reused, so an
/// operator can hold them from construction to teardown.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct TensorId(usize);

impl TensorId {
    /// Returns the raw index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Borrowed operator inputs; five inline slots cover every operator kind.
pub type InputRefs<'a> = SmallVec<[&'a Tensor; 5]>;

/// Owns every tensor of a graph and accounts their buffers against a budget.
///
/// Operators never own tensors. They refer to them by [`TensorId`] and
/// borrow them for the duration of a call, so the "workspace outlives its
/// operators" relationship is expressed by ownership instead of references.
#[derive(Debug, Default)]
pub struct TensorArena {
    tensors: Vec<Tensor>,
    budget: MemoryBudget,
    stats: AllocationStats,
}

impl TensorArena {
    /// Creates an empty arena with the given budget.
    pub fn new(budget: MemoryBudget) -> Self {
        Self {
            tensors: Vec::new(),
            budget,
            stats: AllocationStats::default(),
        }
    }

    /// Returns the budget this arena enforces.
    pub fn budget(&self) -> MemoryBudget {
        self.budget
    }

    /// Returns the allocation statistics so far.
    pub fn stats(&self) -> &AllocationStats {
        &self.stats
    }

    /// Returns the number of tensors in the arena.
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    /// Returns `true` if the arena holds no tensors.
    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// Returns the total bytes currently held by all buffers.
    pub fn allocated_bytes(&self) -> usize {
        self.tensors.iter().map(Tensor::allocated_bytes).sum()
    }

    /// Adds a tensor, allocated or not, and returns its id.
    ///
    /// # Errors
    /// Returns [`ArenaError::OutOfMemory`] if the tensor's existing buffer
    /// does not fit in the remaining budget.
    pub fn insert(&mut self, tensor: Tensor) -> Result<TensorId, ArenaError> {
        let id = TensorId(self.tensors.len());
        let bytes = tensor.allocated_bytes();
        if bytes > 0 {
            self.reserve(id, 0, bytes)?;
            self.tensors.push(tensor);
            self.stats.record_fresh(bytes, self.allocated_bytes());
        } else {
            self.tensors.push(tensor);
        }
        trace!(%id, bytes, "inserted tensor");
        Ok(id)
    }

    /// Adds an unallocated tensor and returns its id.
    pub fn declare(&mut self, shape: Shape, dtype: DType) -> TensorId {
        let id = TensorId(self.tensors.len());
        self.tensors.push(Tensor::declare(shape, dtype));
        id
    }

    /// Borrows a tensor.
    pub fn get(&self, id: TensorId) -> Result<&Tensor, ArenaError> {
        self.tensors.get(id.0).ok_or(ArenaError::UnknownTensor(id))
    }

    /// Sets a tensor's shape. Its buffer is resized on the next
    /// [`TensorArena::allocate`].
    pub fn set_shape(&mut self, id: TensorId, shape: Shape) -> Result<(), ArenaError> {
        self.get_mut(id)?.set_shape(shape);
        Ok(())
    }

    /// Sets a tensor's dtype. Its buffer is resized on the next
    /// [`TensorArena::allocate`].
    pub fn set_dtype(&mut self, id: TensorId, dtype: DType) -> Result<(), ArenaError> {
        self.get_mut(id)?.set_dtype(dtype);
        Ok(())
    }

    /// Materialises a tensor's buffer for its current shape and dtype.
    ///
    /// Idempotent: a buffer that already has the required size is kept
    /// with its contents and the budget is not consulted.
    ///
    /// # Errors
    /// Returns [`ArenaError::OutOfMemory`] if a fresh buffer would push the
    /// arena past its budget; the tensor is left unchanged.
    pub fn allocate(&mut self, id: TensorId) -> Result<Allocation, ArenaError> {
        let tensor = self.get(id)?;
        let held = tensor.allocated_bytes();
        let Some(required) = tensor.required_bytes() else {
            let in_use = self.allocated_bytes() - held;
            return Err(self.out_of_memory(id, in_use, usize::MAX));
        };

        if tensor.is_allocated() && required == held {
            self.stats.record_unchanged();
            return Ok(Allocation::Unchanged);
        }

        self.reserve(id, held, required)?;
        let outcome = self.get_mut(id)?.allocate();
        if let Allocation::Fresh { bytes, .. } = outcome {
            self.stats.record_fresh(bytes, self.allocated_bytes());
            trace!(%id, bytes, "allocated tensor buffer");
        }
        Ok(outcome)
    }

    /// Views a tensor's elements.
    pub fn read<T: Element>(&self, id: TensorId) -> Result<&[T], ArenaError> {
        Ok(self.get(id)?.as_slice::<T>()?)
    }

    /// Copies `values` into an allocated tensor.
    ///
    /// # Errors
    /// Returns an error if the dtype differs, the tensor is unallocated, or
    /// `values` does not hold exactly one element per tensor element.
    pub fn write<T: Element>(&mut self, id: TensorId, values: &[T]) -> Result<(), ArenaError> {
        let tensor = self.get_mut(id)?;
        let expected = tensor.size_bytes();
        let dst = tensor.as_slice_mut::<T>()?;
        if dst.len() != values.len() {
            return Err(tensor_core::TensorError::BufferSizeMismatch {
                expected,
                actual: std::mem::size_of_val(values),
            }
            .into());
        }
        dst.copy_from_slice(values);
        Ok(())
    }

    /// Borrows `inputs` immutably and `output` mutably at the same time.
    ///
    /// Inputs may repeat; none may equal `output`.
    ///
    /// # Errors
    /// Returns [`ArenaError::UnknownTensor`] for a foreign id and
    /// [`ArenaError::AliasedOutput`] if an input is the output.
    pub fn split_io(
        &mut self,
        inputs: &[TensorId],
        output: TensorId,
    ) -> Result<(InputRefs<'_>, &mut Tensor), ArenaError> {
        let out = output.0;
        if out >= self.tensors.len() {
            return Err(ArenaError::UnknownTensor(output));
        }
        for &id in inputs {
            if id == output {
                return Err(ArenaError::AliasedOutput(id));
            }
            if id.0 >= self.tensors.len() {
                return Err(ArenaError::UnknownTensor(id));
            }
        }

        let (head, rest) = self.tensors.split_at_mut(out);
        let (target, tail) = rest
            .split_first_mut()
            .ok_or(ArenaError::UnknownTensor(output))?;
        let (head, tail): (&[Tensor], &[Tensor]) = (head, tail);
        let refs = inputs
            .iter()
            .map(move |id| {
                if id.0 < out {
                    &head[id.0]
                } else {
                    &tail[id.0 - out - 1]
                }
            })
            .collect();
        Ok((refs, target))
    }

    fn get_mut(&mut self, id: TensorId) -> Result<&mut Tensor, ArenaError> {
        self.tensors.get_mut(id.0).ok_or(ArenaError::UnknownTensor(id))
    }

    // Checks that swapping `held` bytes for `required` stays within budget.
    fn reserve(&mut self, id: TensorId, held: usize, required: usize) -> Result<(), ArenaError> {
        let in_use = self.allocated_bytes() - held;
        let fits = in_use
            .checked_add(required)
            .is_some_and(|total| self.budget.admits(total));
        if !fits {
            return Err(self.out_of_memory(id, in_use, required));
        }
        Ok(())
    }

    fn out_of_memory(&mut self, id: TensorId, in_use: usize, requested_bytes: usize) -> ArenaError {
        self.stats.record_oom();
        let budget_bytes = self.budget.as_bytes();
        let available_bytes = budget_bytes.saturating_sub(in_use);
        warn!(%id, requested_bytes, available_bytes, "arena budget exhausted");
        ArenaError::OutOfMemory {
            tensor: id,
            requested_bytes,
            available_bytes,
            budget_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f32_tensor(values: &[f32]) -> Tensor {
        Tensor::from_slice(Shape::vector(values.len()), values).unwrap()
    }

    #[test]
    fn test_ids_are_sequential() {
        let mut arena = TensorArena::default();
        let a = arena.declare(Shape::vector(2), DType::F32);
        let b = arena.insert(f32_tensor(&[1.0])).unwrap();
        assert_eq!((a.index(), b.index()), (0, 1));
        assert_eq!(arena.len(), 2);
        assert_eq!(a.to_string(), "%0");
    }

    #[test]
    fn test_allocate_is_idempotent() {
        let mut arena = TensorArena::default();
        let id = arena.declare(Shape::vector(4), DType::I32);
        assert!(matches!(arena.allocate(id).unwrap(), Allocation::Fresh { bytes: 16, .. }));
        arena.write(id, &[1i32, 2, 3, 4]).unwrap();
        assert_eq!(arena.allocate(id).unwrap(), Allocation::Unchanged);
        assert_eq!(arena.read::<i32>(id).unwrap(), &[1, 2, 3, 4]);

        let stats = arena.stats();
        assert_eq!((stats.fresh, stats.unchanged), (1, 1));
    }

    #[test]
    fn test_budget_enforced() {
        let mut arena = TensorArena::new(MemoryBudget::from_bytes(32));
        let a = arena.declare(Shape::vector(6), DType::F32);
        let b = arena.declare(Shape::vector(4), DType::F32);
        arena.allocate(a).unwrap();
        let err = arena.allocate(b).unwrap_err();
        assert!(matches!(
            err,
            ArenaError::OutOfMemory {
                requested_bytes: 16,
                available_bytes: 8,
                budget_bytes: 32,
                ..
            }
        ));
        assert!(!arena.get(b).unwrap().is_allocated());
        assert_eq!(arena.stats().oom_count, 1);
    }

    #[test]
    fn test_overflowing_shape_is_out_of_memory() {
        let mut arena = TensorArena::default();
        arena.insert(f32_tensor(&[1.0, 2.0])).unwrap();
        let huge = arena.declare(Shape::new(vec![usize::MAX, 4]), DType::F32);

        match arena.allocate(huge) {
            Err(ArenaError::OutOfMemory {
                tensor,
                requested_bytes,
                available_bytes,
                ..
            }) => {
                assert_eq!(tensor, huge);
                assert_eq!(requested_bytes, usize::MAX);
                assert_eq!(available_bytes, usize::MAX - 8);
            }
            other => panic!("expected out-of-memory, got {other:?}"),
        }
        assert!(!arena.get(huge).unwrap().is_allocated());
        assert_eq!(arena.stats().oom_count, 1);
    }

    #[test]
    fn test_resize_reuses_budget_of_old_buffer() {
        let mut arena = TensorArena::new(MemoryBudget::from_bytes(32));
        let id = arena.declare(Shape::vector(8), DType::F32);
        arena.allocate(id).unwrap();
        arena.set_dtype(id, DType::U8).unwrap();
        assert!(matches!(arena.allocate(id).unwrap(), Allocation::Fresh { bytes: 8, .. }));
        assert_eq!(arena.allocated_bytes(), 8);
    }

    #[test]
    fn test_insert_counts_against_budget() {
        let mut arena = TensorArena::new(MemoryBudget::from_bytes(8));
        arena.insert(f32_tensor(&[1.0, 2.0])).unwrap();
        assert!(matches!(
            arena.insert(f32_tensor(&[3.0])),
            Err(ArenaError::OutOfMemory { .. })
        ));
    }

    #[test]
    fn test_split_io() {
        let mut arena = TensorArena::default();
        let a = arena.insert(f32_tensor(&[1.0])).unwrap();
        let out = arena.declare(Shape::vector(1), DType::F32);
        let b = arena.insert(f32_tensor(&[2.0])).unwrap();
        arena.allocate(out).unwrap();

        let (inputs, target) = arena.split_io(&[b, a, b], out).unwrap();
        let x = inputs[1].as_slice::<f32>().unwrap()[0];
        let y = inputs[0].as_slice::<f32>().unwrap()[0];
        target.as_slice_mut::<f32>().unwrap()[0] = x + y;
        assert_eq!(inputs.len(), 3);
        drop(inputs);
        assert_eq!(arena.read::<f32>(out).unwrap(), &[3.0]);
    }

    #[test]
    fn test_split_io_rejects_alias_and_unknown() {
        let mut arena = TensorArena::default();
        let a = arena.insert(f32_tensor(&[1.0])).unwrap();
        assert!(matches!(arena.split_io(&[a], a), Err(ArenaError::AliasedOutput(_))));
        let ghost = TensorId(9);
        assert!(matches!(arena.split_io(&[ghost], a), Err(ArenaError::UnknownTensor(_))));
        assert!(matches!(arena.split_io(&[a], ghost), Err(ArenaError::UnknownTensor(_))));
    }

    #[test]
    fn test_write_length_checked() {
        let mut arena = TensorArena::default();
        let id = arena.insert(f32_tensor(&[0.0, 0.0])).unwrap();
        assert!(arena.write(id, &[1.0f32]).is_err());
        assert!(matches!(
            arena.write(id, &[1u8, 2]),
            Err(ArenaError::Tensor(tensor_core::TensorError::DTypeMismatch { .. }))
        ));
    }
}
