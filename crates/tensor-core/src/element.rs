// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Static element types and native numeric conversion between them.
//!
//! [`Element`] ties a Rust scalar type to its runtime [`DType`] tag so a
//! tensor buffer can be viewed as `&[T]` after checking the tag once.
//! [`NativeCast`] is the plain, non-saturating conversion used by the cast
//! kernels:
//!
//! | source  | destination | behaviour                                           |
//! |---------|-------------|-----------------------------------------------------|
//! | integer | integer     | two's-complement wrap / sign extension              |
//! | integer | float       | nearest representable value                         |
//! | float   | float       | nearest representable value                         |
//! | float   | integer     | truncate toward zero, then wrap to the target width |
//!
//! Rust's `as` saturates float → integer conversions, so that row goes
//! through a 128-bit intermediate instead: `300.7_f32` becomes `44_u8` and
//! `-1.0_f32` becomes `255_u8`. NaN becomes 0.

use crate::DType;

/// A scalar type that can be stored in a [`crate::Tensor`].
pub trait Element:
    bytemuck::Pod + PartialOrd + std::fmt::Debug + Send + Sync + 'static
{
    /// The runtime tag for this type.
    const DTYPE: DType;
}

macro_rules! impl_element {
    ($($ty:ty => $dtype:ident),* $(,)?) => {
        $(
            impl Element for $ty {
                const DTYPE: DType = DType::$dtype;
            }
        )*
    };
}

impl_element! {
    f32 => F32,
    f64 => F64,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
}

/// Native numeric conversion from `Self` into `D`.
pub trait NativeCast<D>: Copy {
    /// Converts `self` into `D` without saturation.
    fn native_cast(self) -> D;
}

macro_rules! impl_cast_from_int {
    (@dst $src:ty => $($dst:ty),*) => {
        $(
            impl NativeCast<$dst> for $src {
                #[inline(always)]
                fn native_cast(self) -> $dst {
                    self as $dst
                }
            }
        )*
    };
    ($($src:ty),*) => {
        $(
            impl_cast_from_int!(@dst $src => f32, f64, i8, i16, i32, i64, u8, u16, u32, u64);
        )*
    };
}

macro_rules! impl_cast_from_float {
    (@float $src:ty => $($dst:ty),*) => {
        $(
            impl NativeCast<$dst> for $src {
                #[inline(always)]
                fn native_cast(self) -> $dst {
                    self as $dst
                }
            }
        )*
    };
    (@int $src:ty => $($dst:ty),*) => {
        $(
            impl NativeCast<$dst> for $src {
                #[inline(always)]
                fn native_cast(self) -> $dst {
                    // Truncation into i128 is exact for every finite value an
                    // integer target can hold; the second `as` wraps.
                    (self as i128) as $dst
                }
            }
        )*
    };
    ($($src:ty),*) => {
        $(
            impl_cast_from_float!(@float $src => f32, f64);
            impl_cast_from_float!(@int $src => i8, i16, i32, i64, u8, u16, u32, u64);
        )*
    };
}

impl_cast_from_int!(i8, i16, i32, i64, u8, u16, u32, u64);
impl_cast_from_float!(f32, f64);
