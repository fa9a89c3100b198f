// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The operator lifecycle with type-state–enforced ordering.
//!
//! ```text
//! OpInstance<Allocated>
//!     │  .config(&settings)
//!     ▼
//! OpInstance<Configured>
//!     │  .prepare(&mut arena)
//!     ▼
//! OpInstance<Prepared>
//!     │  .run(&mut arena)   (any number of times)
//!     ▼
//!   drop  (destroy + dealloc)
//! ```
//!
//! Each transition consumes the old value, so running an unprepared
//! operator or preparing twice is a compile error.

use std::fmt;

use smallvec::SmallVec;
use tensor_arena::{TensorArena, TensorId};

use crate::{OpError, OpSettings};

/// The uniform run routine bound at prepare time.
///
/// One monomorphised function per (input dtype, output dtype) pair; it reads
/// the operator's inputs from the arena and writes its outputs.
pub type RunFn = fn(&OpIo, &mut TensorArena) -> Result<(), OpError>;

/// The operator kinds this backend implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum OpKind {
    /// `(a + b) / c`, clamped, then cast.
    #[serde(rename = "add_div_clip_cast")]
    AddDivClipCast,
    /// Element-wise dtype conversion.
    #[serde(rename = "cast")]
    Cast,
    /// Hard-swish activation.
    #[serde(rename = "hswish")]
    HSwish,
}

impl OpKind {
    /// Every operator kind.
    pub const ALL: [OpKind; 3] = [OpKind::AddDivClipCast, OpKind::Cast, OpKind::HSwish];

    /// Returns the registered type name.
    pub fn name(self) -> &'static str {
        match self {
            Self::AddDivClipCast => "add_div_clip_cast",
            Self::Cast => "cast",
            Self::HSwish => "hswish",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The tensors an operator reads and writes, as arena ids.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OpIo {
    inputs: SmallVec<[TensorId; 5]>,
    outputs: SmallVec<[TensorId; 1]>,
}

impl OpIo {
    /// Wires an operator to its input and output tensors.
    pub fn new(inputs: &[TensorId], outputs: &[TensorId]) -> Self {
        Self {
            inputs: SmallVec::from_slice(inputs),
            outputs: SmallVec::from_slice(outputs),
        }
    }

    /// Returns the input ids in order.
    pub fn inputs(&self) -> &[TensorId] {
        &self.inputs
    }

    /// Returns the output ids in order.
    pub fn outputs(&self) -> &[TensorId] {
        &self.outputs
    }

    /// Returns the first output.
    pub fn output(&self) -> Result<TensorId, OpError> {
        self.outputs.first().copied().ok_or(OpError::NoOutput)
    }

    /// Checks the input/output counts for `op`.
    pub fn check_arity(&self, op: OpKind, inputs: usize, outputs: usize) -> Result<(), OpError> {
        if self.inputs.len() != inputs || self.outputs.len() != outputs {
            return Err(OpError::Arity {
                op,
                expected_inputs: inputs,
                expected_outputs: outputs,
                inputs: self.inputs.len(),
                outputs: self.outputs.len(),
            });
        }
        Ok(())
    }

    /// Rejects any output that is also an input.
    pub fn check_aliasing(&self) -> Result<(), OpError> {
        match self.outputs.iter().find(|out| self.inputs.contains(out)) {
            Some(&id) => Err(OpError::AliasedOutput(id)),
            None => Ok(()),
        }
    }
}

/// One operator kind's config and prepare steps.
///
/// Implementations start zero-initialised (their `alloc` is the registry
/// constructor) and hold only what config read from settings. Release is
/// `Drop`.
pub trait Operator: fmt::Debug + Send {
    /// Returns the operator kind.
    fn kind(&self) -> OpKind;

    /// Reads the settings this kind requires.
    ///
    /// # Errors
    /// [`OpError::MissingSetting`] or [`OpError::SettingTypeMismatch`].
    fn config(&mut self, settings: &OpSettings) -> Result<(), OpError>;

    /// Finalises output shapes and dtypes, allocates every tensor the
    /// operator touches, and returns the routine for the dtype pairing.
    ///
    /// This is the only step that inspects tensors.
    fn prepare(&self, arena: &mut TensorArena, io: &OpIo) -> Result<RunFn, OpError>;
}

// ── Type-state markers ─────────────────────────────────────────

/// Allocated but not configured.
#[derive(Debug)]
pub struct Allocated;

/// Settings have been read.
#[derive(Debug)]
pub struct Configured;

/// Prepared with a bound run routine.
pub struct Prepared {
    run: RunFn,
}

impl fmt::Debug for Prepared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prepared").finish_non_exhaustive()
    }
}

/// Sealed trait for operator states.
pub trait OpState: fmt::Debug {}
impl OpState for Allocated {}
impl OpState for Configured {}
impl OpState for Prepared {}

// ── Instance ───────────────────────────────────────────────────

/// An operator wired into a graph, tracked through its lifecycle.
#[derive(Debug)]
pub struct OpInstance<S: OpState = Allocated> {
    op: Box<dyn Operator>,
    io: OpIo,
    state: S,
}

impl<S: OpState> OpInstance<S> {
    /// Returns the operator kind.
    pub fn kind(&self) -> OpKind {
        self.op.kind()
    }

    /// Returns the wired tensors.
    pub fn io(&self) -> &OpIo {
        &self.io
    }
}

impl OpInstance<Allocated> {
    /// Wraps a freshly allocated operator.
    pub fn new(op: Box<dyn Operator>, io: OpIo) -> Self {
        Self {
            op,
            io,
            state: Allocated,
        }
    }

    /// Reads settings. Transitions to `Configured`.
    pub fn config(mut self, settings: &OpSettings) -> Result<OpInstance<Configured>, OpError> {
        self.op.config(settings)?;
        Ok(OpInstance {
            op: self.op,
            io: self.io,
            state: Configured,
        })
    }
}

impl OpInstance<Configured> {
    /// Binds the run routine. Transitions to `Prepared`.
    pub fn prepare(self, arena: &mut TensorArena) -> Result<OpInstance<Prepared>, OpError> {
        let run = self.op.prepare(arena, &self.io)?;
        Ok(OpInstance {
            op: self.op,
            io: self.io,
            state: Prepared { run },
        })
    }
}

impl OpInstance<Prepared> {
    /// Executes the bound routine once.
    ///
    /// Repeated calls with unchanged inputs produce identical outputs.
    pub fn run(&self, arena: &mut TensorArena) -> Result<(), OpError> {
        (self.state.run)(&self.io, arena)
    }

    /// Returns the bound routine.
    pub fn run_fn(&self) -> RunFn {
        self.state.run
    }
}
