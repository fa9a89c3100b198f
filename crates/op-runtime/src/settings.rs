// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-operator typed settings.
//!
//! Settings are keyed by small integers whose meaning is private to each
//! operator kind. Operators read them once, at config time.
//!
//! # TOML Format
//! ```toml
//! [[settings]]
//! key = 1
//! value = { dtype = "u8" }
//! ```

use std::collections::BTreeMap;
use std::fmt;

use tensor_core::DType;

use crate::OpError;

/// Key of a single operator setting.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct SettingKey(pub u32);

impl SettingKey {
    /// Target dtype of cast-like operators.
    pub const CAST_DTYPE: SettingKey = SettingKey(1);
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A typed setting value.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingValue {
    U32(u32),
    I32(i32),
    F32(f32),
    Bool(bool),
    DType(DType),
}

impl SettingValue {
    /// Returns the type tag of this value.
    pub fn setting_type(&self) -> SettingType {
        match self {
            Self::U32(_) => SettingType::U32,
            Self::I32(_) => SettingType::I32,
            Self::F32(_) => SettingType::F32,
            Self::Bool(_) => SettingType::Bool,
            Self::DType(_) => SettingType::DType,
        }
    }
}

/// Type tag of a [`SettingValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingType {
    U32,
    I32,
    F32,
    Bool,
    DType,
}

impl fmt::Display for SettingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::U32 => "u32",
            Self::I32 => "i32",
            Self::F32 => "f32",
            Self::Bool => "bool",
            Self::DType => "dtype",
        };
        f.write_str(name)
    }
}

/// One `key = value` pair in the serialised form of [`OpSettings`].
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SettingEntry {
    pub key: SettingKey,
    pub value: SettingValue,
}

/// The settings of one operator instance.
///
/// # Examples
/// ```
/// use op_runtime::{OpSettings, SettingKey, SettingValue};
/// use tensor_core::DType;
///
/// let s = OpSettings::new().with(SettingKey::CAST_DTYPE, SettingValue::DType(DType::U8));
/// assert_eq!(s.get_dtype(SettingKey::CAST_DTYPE).unwrap(), DType::U8);
/// ```
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(from = "Vec<SettingEntry>", into = "Vec<SettingEntry>")]
pub struct OpSettings {
    values: BTreeMap<SettingKey, SettingValue>,
}

impl OpSettings {
    /// Creates an empty settings set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`OpSettings::set`].
    pub fn with(mut self, key: SettingKey, value: SettingValue) -> Self {
        self.set(key, value);
        self
    }

    /// Sets a value, returning the previous one.
    pub fn set(&mut self, key: SettingKey, value: SettingValue) -> Option<SettingValue> {
        self.values.insert(key, value)
    }

    /// Returns a value regardless of type.
    pub fn get(&self, key: SettingKey) -> Option<SettingValue> {
        self.values.get(&key).copied()
    }

    /// Returns a value, requiring it to be present with type `expected`.
    ///
    /// # Errors
    /// [`OpError::MissingSetting`] or [`OpError::SettingTypeMismatch`].
    pub fn get_scalar(&self, key: SettingKey, expected: SettingType) -> Result<SettingValue, OpError> {
        let value = self.get(key).ok_or(OpError::MissingSetting { key })?;
        let actual = value.setting_type();
        if actual != expected {
            return Err(OpError::SettingTypeMismatch {
                key,
                expected,
                actual,
            });
        }
        Ok(value)
    }

    /// Returns a dtype-valued setting.
    pub fn get_dtype(&self, key: SettingKey) -> Result<DType, OpError> {
        match self.get_scalar(key, SettingType::DType)? {
            SettingValue::DType(dtype) => Ok(dtype),
            other => Err(OpError::SettingTypeMismatch {
                key,
                expected: SettingType::DType,
                actual: other.setting_type(),
            }),
        }
    }

    /// Returns the number of settings.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no setting is present.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<SettingEntry>> for OpSettings {
    fn from(entries: Vec<SettingEntry>) -> Self {
        Self {
            values: entries.into_iter().map(|e| (e.key, e.value)).collect(),
        }
    }
}

impl From<OpSettings> for Vec<SettingEntry> {
    fn from(settings: OpSettings) -> Self {
        settings
            .values
            .into_iter()
            .map(|(key, value)| SettingEntry { key, value })
            .collect()
    }
}
