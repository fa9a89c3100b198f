// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # op-runtime
//!
//! The CPU operator backend: a fixed set of element-wise operators behind a
//! uniform lifecycle, and a small sequential executor that drives them.
//!
//! Every operator walks the same pipeline:
//! ```text
//! OpInstance<Allocated> → OpInstance<Configured> → OpInstance<Prepared> → run()*
//! ```
//! `config` reads settings only, `prepare` inspects tensors, fixes output
//! shapes and dtypes, allocates buffers and binds the routine for the
//! observed dtype pairing from a static [`DispatchTable`]. `run` only
//! computes, and may be repeated. Destruction is `Drop`.
//!
//! Operators:
//! - `add_div_clip_cast`: `clip((a + b) / c, min, max)` with broadcasting,
//!   written in the output dtype.
//! - `cast`: element-wise numeric conversion.
//! - `hswish`: hard-swish activation on `f32`.

mod config;
pub mod dispatch;
mod error;
mod executor;
mod metrics;
mod operator;
pub mod ops;
mod registry;
mod settings;

pub use config::RuntimeConfig;
pub use dispatch::{table_for, DispatchEntry, DispatchTable};
pub use error::{OpError, RuntimeError};
pub use executor::{Building, Executor, ExecutorState, Ready};
pub use metrics::{OpMetrics, RunMetrics};
pub use operator::{
    Allocated, Configured, OpInstance, OpIo, OpKind, OpState, Operator, Prepared, RunFn,
};
pub use ops::{AddDivClipCastOp, CastOp, HSwishOp};
pub use registry::{AllocFn, OpRegistry};
pub use settings::{OpSettings, SettingEntry, SettingKey, SettingType, SettingValue};

pub use tensor_arena::{MemoryBudget, TensorArena, TensorId};
