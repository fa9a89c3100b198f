// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-arena
//!
//! The workspace operators are built against: a table of tensors addressed
//! by stable [`TensorId`]s, with budget-enforced, idempotent allocation.
//!
//! # Key Components
//!
//! - [`TensorArena`]: owns every tensor; hands out shared and exclusive
//!   borrows per call, including the split input/output borrow kernels need.
//! - [`MemoryBudget`]: a hard ceiling parsed from strings like `"64M"`.
//! - [`AllocationStats`]: fresh versus unchanged allocations, OOMs, peak bytes.
//!
//! # Example
//! ```
//! use tensor_arena::{MemoryBudget, TensorArena};
//! use tensor_core::{DType, Shape};
//!
//! let mut arena = TensorArena::new(MemoryBudget::from_mb(1));
//! let x = arena.declare(Shape::vector(4), DType::F32);
//! arena.allocate(x).unwrap();
//! arena.allocate(x).unwrap(); // no-op
//! assert_eq!(arena.stats().unchanged, 1);
//! ```

mod arena;
mod budget;
mod error;
mod stats;

pub use arena::{InputRefs, TensorArena, TensorId};
pub use budget::MemoryBudget;
pub use error::ArenaError;
pub use stats::AllocationStats;
