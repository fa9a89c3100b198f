// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for operators and the executor.

use crate::{OpKind, SettingKey, SettingType};
use tensor_arena::{ArenaError, TensorId};
use tensor_core::{DType, TensorError};

/// Errors raised by a single operator during config, prepare, or run.
///
/// Everything except the wrapped tensor/arena errors is a configuration
/// error: it is detected before the first run and there is no recovery
/// other than fixing the graph.
#[derive(Debug, thiserror::Error)]
pub enum OpError {
    /// No routine is registered for this dtype pairing.
    #[error("{op}: unsupported dtype pair {input} -> {output}")]
    UnsupportedDTypes {
        op: OpKind,
        input: DType,
        output: DType,
    },

    /// A required setting is absent.
    #[error("missing setting {key}")]
    MissingSetting { key: SettingKey },

    /// A setting is present with the wrong type.
    #[error("setting {key} has type {actual}, expected {expected}")]
    SettingTypeMismatch {
        key: SettingKey,
        expected: SettingType,
        actual: SettingType,
    },

    /// Wrong number of inputs or outputs.
    #[error("{op} takes {expected_inputs} inputs and {expected_outputs} outputs, got {inputs} and {outputs}")]
    Arity {
        op: OpKind,
        expected_inputs: usize,
        expected_outputs: usize,
        inputs: usize,
        outputs: usize,
    },

    /// The input shapes do not broadcast together.
    #[error("{op}: incompatible input shapes: {source}")]
    IncompatibleShapes {
        op: OpKind,
        #[source]
        source: TensorError,
    },

    /// An output tensor is also one of the inputs.
    #[error("output {0} is also an input")]
    AliasedOutput(TensorId),

    /// The operator was wired without an output tensor.
    #[error("operator has no output tensor")]
    NoOutput,

    /// A kernel-level failure.
    #[error(transparent)]
    Tensor(#[from] TensorError),

    /// An arena failure, including budget exhaustion.
    #[error(transparent)]
    Arena(#[from] ArenaError),
}

/// Errors raised while building, preparing, or running a graph.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// No operator is registered under this name.
    #[error("unknown operator type '{0}'")]
    UnknownOperator(String),

    /// An operator failed; the graph is unusable.
    #[error("operator #{index} ({op}) failed: {source}")]
    Operator {
        index: usize,
        op: OpKind,
        #[source]
        source: OpError,
    },

    /// Tensor table failure outside any operator.
    #[error("arena error: {0}")]
    Arena(#[from] ArenaError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}
