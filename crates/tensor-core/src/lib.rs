// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! Tensor types and element-wise CPU kernels for the operator runtime.
//!
//! This crate provides:
//! - [`Tensor`]: a shape, a dtype tag, and an optional, lazily allocated buffer.
//! - [`Shape`]: inline dimension storage with right-aligned broadcasting helpers.
//! - [`DType`] and [`Element`]: the runtime type tag and its static counterpart.
//! - Kernels: fused add/div/clip/cast with four broadcasting strategies,
//!   element-wise cast, and hard-swish.
//!
//! # Design Goals
//! - Kernels write into pre-allocated outputs; no allocation in element loops.
//! - Typed access is checked against the dtype tag, never reinterpreted silently.
//! - Clean error types via `thiserror`.

pub mod broadcast;
mod dtype;
mod element;
mod error;
mod ops;
mod shape;
mod tensor;

pub use broadcast::BroadcastIndexer;
pub use dtype::DType;
pub use element::{Element, NativeCast};
pub use error::TensorError;
pub use ops::{
    add_div_clip_cast, broadcast_output_shape, cast, cast_slice, hard_swish, hard_swish_scalar,
    AddDivClip, BroadcastStrategy, FusedArith, Operand,
};
pub use shape::{Dims, Shape};
pub use tensor::{Allocation, Tensor};
