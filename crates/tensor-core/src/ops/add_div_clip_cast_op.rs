// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Fused `(a + b) / c → clip → cast` with implicit broadcasting.
//!
//! ```text
//! out[i] = D( clip( (a[i] + b[i']) / c[i'], min[0], max[0] ) )
//! ```
//!
//! The arithmetic and the clamp happen in the input type `T`; the result is
//! then converted to `D` with [`NativeCast`]. The clamp bounds are scalars:
//! only the first element of the bound tensors is read.
//!
//! Four strategies are tried from most to least specialised. They produce
//! bit-identical results wherever more than one applies:
//!
//! | strategy      | operand shapes (right-aligned to the output)           |
//! |---------------|--------------------------------------------------------|
//! | `ExactMatch`  | `a`, `b`, `c` all equal the output                     |
//! | `Scalar`      | `a` equals the output, `b` and `c` hold one element    |
//! | `PerChannel`  | rank-4 output, `b` = `c` = `[N' ∈ {1, N}, 1, 1, W]`    |
//! | `General`     | anything that broadcasts (O(rank) per element)         |

use crate::broadcast::BroadcastIndexer;
use crate::{Element, NativeCast, Shape, Tensor, TensorError};

/// Number of elements processed per unrolled block in the scalar path.
const SCALAR_BLOCK: usize = 4;

/// Add-then-divide in the element's own arithmetic.
///
/// Floats follow IEEE 754 (division by zero yields ±∞ or NaN). Integers
/// wrap on overflow, and an integer division by zero yields 0.
pub trait FusedArith: Element {
    /// Returns `(self + addend) / divisor`.
    fn add_div(self, addend: Self, divisor: Self) -> Self;
}

macro_rules! impl_fused_float {
    ($($ty:ty),*) => {
        $(
            impl FusedArith for $ty {
                #[inline(always)]
                fn add_div(self, addend: Self, divisor: Self) -> Self {
                    (self + addend) / divisor
                }
            }
        )*
    };
}

macro_rules! impl_fused_int {
    ($($ty:ty),*) => {
        $(
            impl FusedArith for $ty {
                #[inline(always)]
                fn add_div(self, addend: Self, divisor: Self) -> Self {
                    let sum = self.wrapping_add(addend);
                    if divisor == 0 {
                        0
                    } else {
                        sum.wrapping_div(divisor)
                    }
                }
            }
        )*
    };
}

impl_fused_float!(f32, f64);
impl_fused_int!(i8, i16, i32, i64, u8, u16, u32, u64);

/// The iteration scheme used to evaluate the fused expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BroadcastStrategy {
    /// All operands share the output shape; plain linear walk.
    ExactMatch,
    /// Addend and divisor are single elements hoisted out of the loop.
    Scalar,
    /// Addend and divisor vary only by batch and innermost column.
    PerChannel,
    /// Per-element index resolution against the output shape.
    General,
}

impl BroadcastStrategy {
    /// Strategies in the order they are tried.
    pub const PRIORITY: [BroadcastStrategy; 4] = [
        BroadcastStrategy::ExactMatch,
        BroadcastStrategy::Scalar,
        BroadcastStrategy::PerChannel,
        BroadcastStrategy::General,
    ];

    /// Returns a short label for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExactMatch => "exact_match",
            Self::Scalar => "scalar",
            Self::PerChannel => "per_channel",
            Self::General => "general",
        }
    }
}

/// A read-only operand: its declared shape and its flat buffer.
#[derive(Debug, Clone, Copy)]
pub struct Operand<'a, T> {
    shape: &'a Shape,
    data: &'a [T],
}

impl<'a, T: Element> Operand<'a, T> {
    /// Pairs a shape with its data.
    ///
    /// # Errors
    /// Returns [`TensorError::BufferSizeMismatch`] if `data` does not hold
    /// exactly `shape.num_elements()` elements.
    pub fn new(shape: &'a Shape, data: &'a [T]) -> Result<Self, TensorError> {
        if data.len() != shape.num_elements() {
            return Err(TensorError::BufferSizeMismatch {
                expected: shape.size_bytes(T::DTYPE),
                actual: std::mem::size_of_val(data),
            });
        }
        Ok(Self { shape, data })
    }

    /// Borrows an allocated tensor as an operand.
    pub fn from_tensor(tensor: &'a Tensor) -> Result<Self, TensorError> {
        Self::new(tensor.shape(), tensor.as_slice::<T>()?)
    }

    /// Returns the operand's shape.
    pub fn shape(&self) -> &'a Shape {
        self.shape
    }

    /// Returns the operand's elements.
    pub fn data(&self) -> &'a [T] {
        self.data
    }
}

/// The fused add/divide/clip expression over three broadcastable operands.
#[derive(Debug, Clone, Copy)]
pub struct AddDivClip<'a, T> {
    a: Operand<'a, T>,
    b: Operand<'a, T>,
    c: Operand<'a, T>,
    min: T,
    max: T,
}

impl<'a, T: FusedArith> AddDivClip<'a, T> {
    /// Builds the expression from its operands and scalar clamp bounds.
    pub fn new(a: Operand<'a, T>, b: Operand<'a, T>, c: Operand<'a, T>, min: T, max: T) -> Self {
        Self { a, b, c, min, max }
    }

    /// Builds the expression from the five operator inputs
    /// `[a, addend, divisor, min, max]`.
    ///
    /// Only the first element of `min` and `max` is read.
    pub fn from_tensors(inputs: &[&'a Tensor]) -> Result<Self, TensorError> {
        let &[a, b, c, min, max] = inputs else {
            return Err(TensorError::OperandCount {
                op: "add_div_clip_cast",
                expected: 5,
                actual: inputs.len(),
            });
        };
        let min = first_element::<T>(min, "min")?;
        let max = first_element::<T>(max, "max")?;
        Ok(Self::new(
            Operand::from_tensor(a)?,
            Operand::from_tensor(b)?,
            Operand::from_tensor(c)?,
            min,
            max,
        ))
    }

    /// Returns the broadcast of the three operand shapes.
    pub fn output_shape(&self) -> Result<Shape, TensorError> {
        broadcast_output_shape(self.a.shape, self.b.shape, self.c.shape)
    }

    /// Returns the most specialised strategy that fits `out_shape`.
    pub fn select_strategy(&self, out_shape: &Shape) -> BroadcastStrategy {
        BroadcastStrategy::PRIORITY
            .into_iter()
            .find(|&s| self.supports(s, out_shape))
            .unwrap_or(BroadcastStrategy::General)
    }

    /// Returns `true` if `strategy` can evaluate this expression into `out_shape`.
    pub fn supports(&self, strategy: BroadcastStrategy, out_shape: &Shape) -> bool {
        let a_full = self.a.shape.aligned_eq(out_shape);
        match strategy {
            BroadcastStrategy::ExactMatch => {
                a_full && self.b.shape.aligned_eq(out_shape) && self.c.shape.aligned_eq(out_shape)
            }
            BroadcastStrategy::Scalar => {
                a_full && self.b.data.len() == 1 && self.c.data.len() == 1
            }
            BroadcastStrategy::PerChannel => {
                a_full
                    && self.b.shape.aligned_eq(self.c.shape)
                    && is_per_channel(self.b.shape, out_shape)
            }
            BroadcastStrategy::General => true,
        }
    }

    /// Evaluates into `dst` with the automatically selected strategy.
    ///
    /// # Errors
    /// Returns an error if `dst` does not match `out_shape` or an operand
    /// does not broadcast to `out_shape`.
    pub fn compute<D>(&self, out_shape: &Shape, dst: &mut [D]) -> Result<BroadcastStrategy, TensorError>
    where
        T: NativeCast<D>,
        D: Element,
    {
        let strategy = self.select_strategy(out_shape);
        self.compute_with(strategy, out_shape, dst)?;
        Ok(strategy)
    }

    /// Evaluates into `dst` with a caller-chosen strategy.
    ///
    /// # Errors
    /// In addition to the checks of [`AddDivClip::compute`], returns
    /// [`TensorError::StrategyNotApplicable`] if `strategy` does not fit the
    /// operand shapes.
    pub fn compute_with<D>(
        &self,
        strategy: BroadcastStrategy,
        out_shape: &Shape,
        dst: &mut [D],
    ) -> Result<(), TensorError>
    where
        T: NativeCast<D>,
        D: Element,
    {
        if dst.len() != out_shape.num_elements() {
            return Err(TensorError::BufferSizeMismatch {
                expected: out_shape.size_bytes(D::DTYPE),
                actual: std::mem::size_of_val(dst),
            });
        }
        for operand in [&self.a, &self.b, &self.c] {
            if !operand.shape.broadcasts_to(out_shape) {
                return Err(TensorError::NotBroadcastable {
                    operand: operand.shape.clone(),
                    target: out_shape.clone(),
                });
            }
        }
        if !self.supports(strategy, out_shape) {
            return Err(TensorError::StrategyNotApplicable { strategy });
        }
        if dst.is_empty() {
            return Ok(());
        }

        match strategy {
            BroadcastStrategy::ExactMatch => self.exact_match(dst),
            BroadcastStrategy::Scalar => self.scalar(dst),
            BroadcastStrategy::PerChannel => self.per_channel(out_shape, dst),
            BroadcastStrategy::General => self.general(out_shape, dst)?,
        }
        Ok(())
    }

    #[inline(always)]
    fn eval<D>(&self, a: T, b: T, c: T) -> D
    where
        T: NativeCast<D>,
    {
        clip(a.add_div(b, c), self.min, self.max).native_cast()
    }

    fn exact_match<D>(&self, dst: &mut [D])
    where
        T: NativeCast<D>,
    {
        let lanes = self.a.data.iter().zip(self.b.data).zip(self.c.data);
        for (out, ((&a, &b), &c)) in dst.iter_mut().zip(lanes) {
            *out = self.eval(a, b, c);
        }
    }

    fn scalar<D>(&self, dst: &mut [D])
    where
        T: NativeCast<D>,
    {
        let (b, c) = (self.b.data[0], self.c.data[0]);
        let mut src_blocks = self.a.data.chunks_exact(SCALAR_BLOCK);
        let mut dst_blocks = dst.chunks_exact_mut(SCALAR_BLOCK);
        for (src, out) in (&mut src_blocks).zip(&mut dst_blocks) {
            out[0] = self.eval(src[0], b, c);
            out[1] = self.eval(src[1], b, c);
            out[2] = self.eval(src[2], b, c);
            out[3] = self.eval(src[3], b, c);
        }
        let tail = src_blocks.remainder();
        for (out, &a) in dst_blocks.into_remainder().iter_mut().zip(tail) {
            *out = self.eval(a, b, c);
        }
    }

    fn per_channel<D>(&self, out_shape: &Shape, dst: &mut [D])
    where
        T: NativeCast<D>,
    {
        let width = out_shape.dims()[3];
        let batch_len = out_shape.part_count(1);
        let operand_batches = self.b.data.len() / width;

        let batches = self.a.data.chunks_exact(batch_len).zip(dst.chunks_exact_mut(batch_len));
        for (batch, (src, out)) in batches.enumerate() {
            let row = (batch % operand_batches) * width;
            let b_row = &self.b.data[row..row + width];
            let c_row = &self.c.data[row..row + width];
            for (src_run, out_run) in src.chunks_exact(width).zip(out.chunks_exact_mut(width)) {
                let lanes = src_run.iter().zip(b_row).zip(c_row);
                for (o, ((&a, &b), &c)) in out_run.iter_mut().zip(lanes) {
                    *o = self.eval(a, b, c);
                }
            }
        }
    }

    fn general<D>(&self, out_shape: &Shape, dst: &mut [D]) -> Result<(), TensorError>
    where
        T: NativeCast<D>,
    {
        let ia = BroadcastIndexer::new(out_shape, self.a.shape)?;
        let ib = BroadcastIndexer::new(out_shape, self.b.shape)?;
        let ic = BroadcastIndexer::new(out_shape, self.c.shape)?;
        for (i, out) in dst.iter_mut().enumerate() {
            *out = self.eval(
                self.a.data[ia.index(i)],
                self.b.data[ib.index(i)],
                self.c.data[ic.index(i)],
            );
        }
        Ok(())
    }
}

/// Returns the broadcast of the three operand shapes of the fused expression.
pub fn broadcast_output_shape(a: &Shape, b: &Shape, c: &Shape) -> Result<Shape, TensorError> {
    let ab = a.broadcast_with(b).ok_or_else(|| TensorError::ShapeMismatch {
        op: "add_div_clip_cast",
        lhs: a.clone(),
        rhs: b.clone(),
    })?;
    ab.broadcast_with(c).ok_or_else(|| TensorError::ShapeMismatch {
        op: "add_div_clip_cast",
        lhs: ab.clone(),
        rhs: c.clone(),
    })
}

/// Evaluates the fused operator from tensors.
///
/// `inputs` is `[a, addend, divisor, min, max]`, all of element type `T`;
/// `output` must already have its final shape, dtype `D`, and a buffer.
///
/// # Errors
/// Returns an error on operand count, dtype, allocation, or shape problems.
pub fn add_div_clip_cast<T, D>(
    inputs: &[&Tensor],
    output: &mut Tensor,
) -> Result<BroadcastStrategy, TensorError>
where
    T: FusedArith + NativeCast<D>,
    D: Element,
{
    let expr = AddDivClip::<T>::from_tensors(inputs)?;
    let out_shape = output.shape().clone();
    expr.compute(&out_shape, output.as_slice_mut::<D>()?)
}

/// Clamps with `x < min ? min : (max < x ? max : x)`; NaN passes through.
#[inline(always)]
fn clip<T: PartialOrd>(x: T, min: T, max: T) -> T {
    if x < min {
        min
    } else if max < x {
        max
    } else {
        x
    }
}

fn is_per_channel(operand: &Shape, out_shape: &Shape) -> bool {
    if out_shape.rank() != 4 {
        return false;
    }
    let Some(aligned) = operand.aligned_to(4) else {
        return false;
    };
    let (d, o) = (aligned.dims(), out_shape.dims());
    d[1] == 1 && d[2] == 1 && d[3] == o[3] && (d[0] == 1 || d[0] == o[0])
}

fn first_element<T: Element>(tensor: &Tensor, bound: &'static str) -> Result<T, TensorError> {
    tensor
        .as_slice::<T>()?
        .first()
        .copied()
        .ok_or(TensorError::EmptyClipBound { bound })
}
