// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Core tensor type.

use crate::{DType, Element, Shape, TensorError};

/// Outcome of a [`Tensor::allocate`] request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allocation {
    /// The existing buffer already had the required size; contents kept.
    Unchanged,
    /// A fresh zeroed buffer replaced a missing or differently sized one.
    Fresh {
        /// Bytes held before the request (0 if unallocated).
        previous_bytes: usize,
        /// Bytes held now.
        bytes: usize,
    },
}

/// An n-dimensional tensor stored in contiguous row-major memory.
///
/// A tensor can exist without a buffer: the graph declares shapes and dtypes
/// first and buffers are materialised later by [`Tensor::allocate`], which
/// is idempotent.
///
/// # Memory Layout
/// The buffer is a `Vec<u64>` so that every supported element type is
/// correctly aligned; typed access goes through [`Tensor::as_slice`] and
/// [`Tensor::as_slice_mut`], which check the dtype tag.
#[derive(Debug, Clone)]
pub struct Tensor {
    shape: Shape,
    dtype: DType,
    data: Option<Vec<u64>>,
}

impl Tensor {
    /// Declares a tensor without allocating its buffer.
    pub fn declare(shape: Shape, dtype: DType) -> Self {
        Self {
            shape,
            dtype,
            data: None,
        }
    }

    /// Creates a new tensor filled with zeros.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Tensor, Shape, DType};
    /// let t = Tensor::zeros(Shape::new(vec![2, 3]), DType::F32);
    /// assert_eq!(t.size_bytes(), 24); // 2 * 3 * 4 bytes
    /// ```
    pub fn zeros(shape: Shape, dtype: DType) -> Self {
        let mut tensor = Self::declare(shape, dtype);
        tensor.allocate();
        tensor
    }

    /// Creates a tensor holding a copy of `values`.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Tensor, Shape};
    /// let t = Tensor::from_slice(Shape::vector(3), &[1.0f32, 2.0, 3.0]).unwrap();
    /// assert_eq!(t.as_slice::<f32>().unwrap(), &[1.0, 2.0, 3.0]);
    /// ```
    ///
    /// # Errors
    /// Returns [`TensorError::BufferSizeMismatch`] if `values` does not hold
    /// exactly `shape.num_elements()` elements.
    pub fn from_slice<T: Element>(shape: Shape, values: &[T]) -> Result<Self, TensorError> {
        let expected = shape.num_elements();
        if values.len() != expected {
            return Err(TensorError::BufferSizeMismatch {
                expected: expected * T::DTYPE.size_bytes(),
                actual: std::mem::size_of_val(values),
            });
        }
        let mut tensor = Self::zeros(shape, T::DTYPE);
        tensor.as_slice_mut::<T>()?.copy_from_slice(values);
        Ok(tensor)
    }

    /// Creates a single-element tensor of shape `[1]`.
    pub fn scalar<T: Element>(value: T) -> Self {
        let mut tensor = Self::zeros(Shape::vector(1), T::DTYPE);
        if let Ok(slot) = tensor.as_slice_mut::<T>() {
            slot[0] = value;
        }
        tensor
    }

    /// Returns the tensor's shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns the tensor's data type.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Returns the number of elements described by the shape.
    pub fn num_elements(&self) -> usize {
        self.shape.num_elements()
    }

    /// Returns the byte size the buffer must have for the current shape and dtype.
    pub fn size_bytes(&self) -> usize {
        self.shape.size_bytes(self.dtype())
    }

    /// Returns the number of bytes currently held by the buffer.
    pub fn allocated_bytes(&self) -> usize {
        self.data.as_ref().map_or(0, |words| words.len() * 8)
    }

    /// Returns `true` once a buffer has been materialised.
    pub fn is_allocated(&self) -> bool {
        self.data.is_some()
    }

    /// Replaces the shape. The buffer is left untouched until the next
    /// [`Tensor::allocate`].
    pub fn set_shape(&mut self, shape: Shape) {
        self.shape = shape;
    }

    /// Replaces the dtype. The buffer is left untouched until the next
    /// [`Tensor::allocate`].
    pub fn set_dtype(&mut self, dtype: DType) {
        self.dtype = dtype;
    }

    /// Sizes the buffer for the current shape and dtype.
    ///
    /// Idempotent: if the buffer already holds the required number of words
    /// the call is a no-op and the contents are kept.
    pub fn allocate(&mut self) -> Allocation {
        let words = words_for(self.size_bytes());
        let previous_bytes = self.allocated_bytes();
        match &self.data {
            Some(existing) if existing.len() == words => Allocation::Unchanged,
            _ => {
                self.data = Some(vec![0u64; words]);
                Allocation::Fresh {
                    previous_bytes,
                    bytes: words * 8,
                }
            }
        }
    }

    /// Returns the number of bytes [`Tensor::allocate`] would hold for the
    /// current shape and dtype, or `None` if that size overflows `usize`.
    pub fn required_bytes(&self) -> Option<usize> {
        let bytes = self.shape.checked_size_bytes(self.dtype)?;
        words_for(bytes).checked_mul(8)
    }

    /// Views the buffer as a slice of `T`.
    ///
    /// # Errors
    /// Returns [`TensorError::DTypeMismatch`] if `T` does not match the
    /// tensor's dtype and [`TensorError::NotAllocated`] before allocation.
    pub fn as_slice<T: Element>(&self) -> Result<&[T], TensorError> {
        self.check_dtype::<T>()?;
        let n = self.num_elements();
        match self.data.as_deref() {
            None => Err(self.not_allocated()),
            Some(words) => {
                let elements: &[T] = bytemuck::cast_slice(words);
                elements.get(..n).ok_or_else(|| self.stale_buffer())
            }
        }
    }

    /// Views the buffer as a mutable slice of `T`.
    ///
    /// # Errors
    /// Same conditions as [`Tensor::as_slice`].
    pub fn as_slice_mut<T: Element>(&mut self) -> Result<&mut [T], TensorError> {
        self.check_dtype::<T>()?;
        let n = self.num_elements();
        let expected = self.size_bytes();
        match self.data.as_deref_mut() {
            None => Err(TensorError::NotAllocated {
                shape: self.shape.clone(),
            }),
            Some(words) => {
                let actual = words.len() * 8;
                let elements: &mut [T] = bytemuck::cast_slice_mut(words);
                elements
                    .get_mut(..n)
                    .ok_or(TensorError::BufferSizeMismatch { expected, actual })
            }
        }
    }

    /// Copies the elements out into a `Vec<T>`.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>, TensorError> {
        self.as_slice::<T>().map(<[T]>::to_vec)
    }

    /// Fills the buffer with a constant value.
    pub fn fill<T: Element>(&mut self, value: T) -> Result<(), TensorError> {
        self.as_slice_mut::<T>()?.fill(value);
        Ok(())
    }

    fn check_dtype<T: Element>(&self) -> Result<(), TensorError> {
        if T::DTYPE != self.dtype() {
            return Err(TensorError::DTypeMismatch {
                expected: T::DTYPE,
                actual: self.dtype(),
            });
        }
        Ok(())
    }

    fn not_allocated(&self) -> TensorError {
        TensorError::NotAllocated {
            shape: self.shape.clone(),
        }
    }

    // Shape or dtype changed after allocation without a new `allocate`.
    fn stale_buffer(&self) -> TensorError {
        TensorError::BufferSizeMismatch {
            expected: self.size_bytes(),
            actual: self.allocated_bytes(),
        }
    }
}

fn words_for(bytes: usize) -> usize {
    bytes.div_ceil(8)
}
