// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! A sequential graph executor with type-state–enforced phases.
//!
//! ```text
//! Executor<Building>
//!     │  .add_tensor() / .declare_tensor() / .add_op()
//!     │  .prepare()
//!     ▼
//! Executor<Ready>
//!     │  .run()   (repeatable)
//!     ▼
//!   RunMetrics
//! ```
//!
//! Operators run in insertion order; ordering between producers and
//! consumers is the caller's responsibility.

use std::marker::PhantomData;
use std::time::Instant;

use tensor_arena::{TensorArena, TensorId};
use tensor_core::{DType, Element, Shape, Tensor};
use tracing::{debug, info};

use crate::operator::{Configured, Prepared};
use crate::{OpInstance, OpIo, OpRegistry, OpSettings, RunMetrics, RuntimeConfig, RuntimeError};

// ── Type-state markers ─────────────────────────────────────────

/// Graph under construction.
#[derive(Debug)]
pub struct Building;

/// Every operator prepared; the graph can run.
#[derive(Debug)]
pub struct Ready;

/// Sealed trait for executor states.
pub trait ExecutorState: std::fmt::Debug {}
impl ExecutorState for Building {}
impl ExecutorState for Ready {}

// ── Executor ───────────────────────────────────────────────────

/// Owns the tensor arena and the operators of one graph.
///
/// # Example
/// ```
/// use op_runtime::{Executor, OpIo, OpSettings, RuntimeConfig, SettingKey, SettingValue};
/// use tensor_core::{DType, Shape, Tensor};
///
/// let mut exec = Executor::new(RuntimeConfig::default())?;
/// let x = exec.add_tensor(Tensor::from_slice(Shape::vector(2), &[1.5f32, -2.5])?)?;
/// let y = exec.declare_tensor(Shape::vector(2), DType::I64);
/// let settings = OpSettings::new().with(SettingKey::CAST_DTYPE, SettingValue::DType(DType::I64));
/// exec.add_op("cast", OpIo::new(&[x], &[y]), &settings)?;
///
/// let mut exec = exec.prepare()?;
/// exec.run()?;
/// assert_eq!(exec.read::<i64>(y)?, &[1, -2]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Executor<S: ExecutorState = Building> {
    config: RuntimeConfig,
    arena: TensorArena,
    registry: OpRegistry,
    pending: Vec<OpInstance<Configured>>,
    ops: Vec<OpInstance<Prepared>>,
    _state: PhantomData<S>,
}

impl<S: ExecutorState> Executor<S> {
    /// Returns the configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Returns the tensor arena.
    pub fn arena(&self) -> &TensorArena {
        &self.arena
    }

    /// Borrows a tensor.
    pub fn tensor(&self, id: TensorId) -> Result<&Tensor, RuntimeError> {
        Ok(self.arena.get(id)?)
    }

    /// Views a tensor's elements.
    pub fn read<T: Element>(&self, id: TensorId) -> Result<&[T], RuntimeError> {
        Ok(self.arena.read(id)?)
    }

    /// Overwrites an allocated tensor's elements.
    pub fn write<T: Element>(&mut self, id: TensorId, values: &[T]) -> Result<(), RuntimeError> {
        Ok(self.arena.write(id, values)?)
    }
}

// ── Building ───────────────────────────────────────────────────

impl Executor<Building> {
    /// Creates an empty graph with the built-in operators.
    pub fn new(config: RuntimeConfig) -> Result<Self, RuntimeError> {
        Self::with_registry(config, OpRegistry::with_builtins())
    }

    /// Creates an empty graph resolving operator names through `registry`.
    pub fn with_registry(config: RuntimeConfig, registry: OpRegistry) -> Result<Self, RuntimeError> {
        let budget = config.parse_budget()?;
        info!("executor created, memory budget: {budget}");
        Ok(Self {
            config,
            arena: TensorArena::new(budget),
            registry,
            pending: Vec::new(),
            ops: Vec::new(),
            _state: PhantomData,
        })
    }

    /// Adds a tensor with its data.
    pub fn add_tensor(&mut self, tensor: Tensor) -> Result<TensorId, RuntimeError> {
        Ok(self.arena.insert(tensor)?)
    }

    /// Adds a tensor whose buffer is allocated by prepare.
    pub fn declare_tensor(&mut self, shape: Shape, dtype: DType) -> TensorId {
        self.arena.declare(shape, dtype)
    }

    /// Allocates and configures an operator; returns its index.
    ///
    /// # Errors
    /// [`RuntimeError::UnknownOperator`], or [`RuntimeError::Operator`]
    /// wrapping a settings error.
    pub fn add_op(
        &mut self,
        type_name: &str,
        io: OpIo,
        settings: &OpSettings,
    ) -> Result<usize, RuntimeError> {
        let index = self.pending.len();
        let op = self.registry.alloc(type_name, io)?;
        let kind = op.kind();
        let op = op.config(settings).map_err(|source| RuntimeError::Operator {
            index,
            op: kind,
            source,
        })?;
        debug!(index, op = %kind, "operator configured");
        self.pending.push(op);
        Ok(index)
    }

    /// Prepares every operator in insertion order.
    /// Transitions to the `Ready` state.
    ///
    /// Stops at the first failing operator.
    pub fn prepare(mut self) -> Result<Executor<Ready>, RuntimeError> {
        let mut ops = Vec::with_capacity(self.pending.len());
        for (index, op) in self.pending.drain(..).enumerate() {
            let kind = op.kind();
            let prepared = op
                .prepare(&mut self.arena)
                .map_err(|source| RuntimeError::Operator {
                    index,
                    op: kind,
                    source,
                })?;
            ops.push(prepared);
        }
        info!(
            ops = ops.len(),
            tensors = self.arena.len(),
            "graph prepared: {}",
            self.arena.stats().summary()
        );

        Ok(Executor {
            config: self.config,
            arena: self.arena,
            registry: self.registry,
            pending: Vec::new(),
            ops,
            _state: PhantomData,
        })
    }
}

// ── Ready ──────────────────────────────────────────────────────

impl Executor<Ready> {
    /// Returns the number of prepared operators.
    pub fn num_ops(&self) -> usize {
        self.ops.len()
    }

    /// Runs every operator once, in order.
    ///
    /// Repeated runs with unchanged inputs produce identical outputs.
    pub fn run(&mut self) -> Result<RunMetrics, RuntimeError> {
        let run_start = Instant::now();
        let profiling = self.config.enable_profiling;
        let mut metrics = RunMetrics::new();

        for (index, op) in self.ops.iter().enumerate() {
            let op_start = Instant::now();
            op.run(&mut self.arena).map_err(|source| RuntimeError::Operator {
                index,
                op: op.kind(),
                source,
            })?;
            if profiling {
                metrics.record_op(index, op.kind(), op_start.elapsed());
            }
        }

        metrics.finalise(
            run_start.elapsed(),
            self.ops.len(),
            self.arena.allocated_bytes(),
            self.arena.stats().peak_bytes,
        );
        if profiling {
            info!("{}", metrics.summary());
        }
        Ok(metrics)
    }
}

impl<S: ExecutorState> std::fmt::Debug for Executor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("state", &std::any::type_name::<S>())
            .field("budget", &self.arena.budget())
            .field("tensors", &self.arena.len())
            .field("pending", &self.pending.len())
            .field("prepared", &self.ops.len())
            .finish()
    }
}
