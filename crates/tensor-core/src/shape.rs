// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor shape descriptors and dimension utilities.

use smallvec::SmallVec;
use std::fmt;

/// Inline capacity for shape dimensions; NCHW tensors never spill.
pub const INLINE_DIMS: usize = 4;

/// Dimension storage shared by [`Shape`] and the broadcasting helpers.
pub type Dims = SmallVec<[usize; INLINE_DIMS]>;

/// Describes the dimensionality of a [`crate::Tensor`].
///
/// Dimensions are stored inline for ranks up to four, which covers the
/// tensors these kernels see in practice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Shape {
    dims: Dims,
}

impl Shape {
    /// Creates a new shape from the given dimensions.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::Shape;
    /// let s = Shape::new(vec![2, 3, 4]);
    /// assert_eq!(s.rank(), 3);
    /// assert_eq!(s.num_elements(), 24);
    /// ```
    pub fn new(dims: Vec<usize>) -> Self {
        Self {
            dims: SmallVec::from_vec(dims),
        }
    }

    /// Creates a scalar shape (rank 0).
    pub fn scalar() -> Self {
        Self {
            dims: SmallVec::new(),
        }
    }

    /// Creates a 1-D shape.
    pub fn vector(len: usize) -> Self {
        Self::from(&[len][..])
    }

    /// Creates a 4-D `[N, C, H, W]` shape.
    pub fn nchw(n: usize, c: usize, h: usize, w: usize) -> Self {
        Self::from(&[n, c, h, w][..])
    }

    /// Returns the number of dimensions (rank).
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Returns the total number of elements.
    ///
    /// For a scalar shape (rank 0), returns 1.
    pub fn num_elements(&self) -> usize {
        self.dims.iter().product()
    }

    /// Returns the total number of elements, or `None` if the product
    /// overflows `usize`.
    pub fn checked_num_elements(&self) -> Option<usize> {
        self.dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    /// Returns the product of the dimensions from `from_dim` onward.
    ///
    /// `part_count(0)` equals [`Shape::num_elements`]; a `from_dim` at or past
    /// the rank yields 1.
    pub fn part_count(&self, from_dim: usize) -> usize {
        self.dims.iter().skip(from_dim).product()
    }

    /// Returns the dimensions as a slice.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Returns the size of a specific dimension, or `None` if out of bounds.
    pub fn dim(&self, index: usize) -> Option<usize> {
        self.dims.get(index).copied()
    }

    /// Computes the memory footprint in bytes for a given [`crate::DType`].
    pub fn size_bytes(&self, dtype: super::DType) -> usize {
        self.num_elements() * dtype.size_bytes()
    }

    /// Like [`Shape::size_bytes`], but `None` on overflow.
    pub fn checked_size_bytes(&self, dtype: super::DType) -> Option<usize> {
        self.checked_num_elements()?.checked_mul(dtype.size_bytes())
    }

    /// Computes row-major (C-order) strides for this shape.
    ///
    /// The stride for dimension `i` is the number of elements to skip
    /// in the flat buffer to advance one step along that dimension.
    pub fn strides(&self) -> Dims {
        let rank = self.dims.len();
        let mut strides: Dims = SmallVec::from_elem(0usize, rank);
        if rank == 0 {
            return strides;
        }
        strides[rank - 1] = 1;
        for i in (0..rank - 1).rev() {
            strides[i] = strides[i + 1] * self.dims[i + 1];
        }
        strides
    }

    /// Right-aligns this shape to `rank` dimensions, padding the front with 1s.
    ///
    /// Returns `None` when the shape already has more than `rank` dimensions.
    ///
    /// ```
    /// use tensor_core::Shape;
    /// let s = Shape::new(vec![3, 1]);
    /// assert_eq!(s.aligned_to(4).unwrap().dims(), &[1, 1, 3, 1]);
    /// ```
    pub fn aligned_to(&self, rank: usize) -> Option<Shape> {
        let own = self.rank();
        if own > rank {
            return None;
        }
        let mut dims: Dims = SmallVec::from_elem(1usize, rank - own);
        dims.extend_from_slice(&self.dims);
        Some(Shape { dims })
    }

    /// Returns `true` if this shape can be broadcast to `target` without
    /// changing `target`: after right-alignment every dimension is 1 or equal
    /// to the target's.
    pub fn broadcasts_to(&self, target: &Shape) -> bool {
        if self.rank() > target.rank() {
            return false;
        }
        self.dims
            .iter()
            .rev()
            .zip(target.dims.iter().rev())
            .all(|(&d, &t)| d == 1 || d == t)
    }

    /// Returns `true` if two shapes are broadcast-compatible.
    ///
    /// Shapes are compatible when, aligning dimensions from the right,
    /// each pair is either equal or one of them is 1.
    pub fn is_broadcast_compatible(&self, other: &Shape) -> bool {
        self.broadcast_with(other).is_some()
    }

    /// Computes the broadcast of two shapes, or `None` if incompatible.
    ///
    /// ```
    /// use tensor_core::Shape;
    /// let a = Shape::new(vec![2, 1, 4]);
    /// let b = Shape::new(vec![3, 1]);
    /// assert_eq!(a.broadcast_with(&b).unwrap().dims(), &[2, 3, 4]);
    /// ```
    pub fn broadcast_with(&self, other: &Shape) -> Option<Shape> {
        let rank = self.rank().max(other.rank());
        let lhs = self.aligned_to(rank)?;
        let rhs = other.aligned_to(rank)?;
        let mut dims: Dims = SmallVec::with_capacity(rank);
        for (&a, &b) in lhs.dims.iter().zip(rhs.dims.iter()) {
            let d = if a == b || b == 1 {
                a
            } else if a == 1 {
                b
            } else {
                return None;
            };
            dims.push(d);
        }
        Some(Shape { dims })
    }

    /// Returns `true` if both shapes describe the same dimensions once
    /// right-aligned (`[4]` and `[1, 4]` are aligned-equal).
    pub fn aligned_eq(&self, other: &Shape) -> bool {
        let rank = self.rank().max(other.rank());
        match (self.aligned_to(rank), other.aligned_to(rank)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

/// Convenience: `Shape::from(vec![2, 3])`.
impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self::new(dims)
    }
}

/// Convenience: `Shape::from(&[2, 3][..])`.
impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self {
            dims: SmallVec::from_slice(dims),
        }
    }
}
