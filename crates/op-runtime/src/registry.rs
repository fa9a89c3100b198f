// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Name → constructor registry for operator kinds.

use std::collections::BTreeMap;

use crate::ops::{AddDivClipCastOp, CastOp, HSwishOp};
use crate::{OpInstance, OpIo, OpKind, Operator, RuntimeError};

/// Creates a zero-initialised operator; reads no settings or tensors.
pub type AllocFn = fn() -> Box<dyn Operator>;

/// Maps operator type names to their constructors.
#[derive(Debug, Clone)]
pub struct OpRegistry {
    allocators: BTreeMap<String, AllocFn>,
}

impl OpRegistry {
    /// Creates a registry with no operators.
    pub fn empty() -> Self {
        Self {
            allocators: BTreeMap::new(),
        }
    }

    /// Creates a registry with every built-in kind under its [`OpKind::name`].
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        for kind in OpKind::ALL {
            registry.register(kind.name(), builtin(kind));
        }
        registry
    }

    /// Registers `alloc` under `name`, returning the constructor it replaced.
    pub fn register(&mut self, name: &str, alloc: AllocFn) -> Option<AllocFn> {
        self.allocators.insert(name.to_string(), alloc)
    }

    /// Returns `true` if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.allocators.contains_key(name)
    }

    /// Returns the registered names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.allocators.keys().map(String::as_str)
    }

    /// Allocates an instance of `name` wired to `io`.
    ///
    /// # Errors
    /// [`RuntimeError::UnknownOperator`] if `name` is not registered.
    pub fn alloc(&self, name: &str, io: OpIo) -> Result<OpInstance, RuntimeError> {
        let alloc = self
            .allocators
            .get(name)
            .ok_or_else(|| RuntimeError::UnknownOperator(name.to_string()))?;
        Ok(OpInstance::new(alloc(), io))
    }
}

impl Default for OpRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn builtin(kind: OpKind) -> AllocFn {
    match kind {
        OpKind::AddDivClipCast => || -> Box<dyn Operator> { Box::<AddDivClipCastOp>::default() },
        OpKind::Cast => || -> Box<dyn Operator> { Box::<CastOp>::default() },
        OpKind::HSwish => || -> Box<dyn Operator> { Box::new(HSwishOp) },
    }
}
