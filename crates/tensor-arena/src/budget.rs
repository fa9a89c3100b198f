// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Memory budget for arena buffers.
//!
//! A [`MemoryBudget`] caps the total bytes held by the buffers of one
//! [`crate::TensorArena`]. It parses human-readable strings so it can be set
//! from a TOML config.

use crate::ArenaError;
use std::fmt;

const KIB: usize = 1024;
const MIB: usize = 1024 * KIB;
const GIB: usize = 1024 * MIB;

/// A hard ceiling on the bytes held by arena buffers.
///
/// # Examples
/// ```
/// use tensor_arena::MemoryBudget;
///
/// let b = MemoryBudget::parse("64M").unwrap();
/// assert_eq!(b.as_bytes(), 64 * 1024 * 1024);
/// assert!(MemoryBudget::unlimited().is_unlimited());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MemoryBudget {
    bytes: usize,
}

impl MemoryBudget {
    /// Creates a budget from a byte count.
    pub fn from_bytes(bytes: usize) -> Self {
        Self { bytes }
    }

    /// Creates a budget from mebibytes.
    pub fn from_mb(mb: usize) -> Self {
        Self::from_bytes(mb.saturating_mul(MIB))
    }

    /// A budget no allocation can exceed.
    pub fn unlimited() -> Self {
        Self::from_bytes(usize::MAX)
    }

    /// Returns `true` for [`MemoryBudget::unlimited`].
    pub fn is_unlimited(&self) -> bool {
        self.bytes == usize::MAX
    }

    /// Returns the budget in bytes.
    pub fn as_bytes(&self) -> usize {
        self.bytes
    }

    /// Returns `true` if `bytes` fit within the budget.
    pub fn admits(&self, bytes: usize) -> bool {
        bytes <= self.bytes
    }

    /// Parses `"512"`, `"64K"`, `"64KB"`, `"16M"`, `"16MB"`, `"1G"`, `"1GB"`
    /// or `"unlimited"`. Case-insensitive; surrounding whitespace is ignored.
    ///
    /// # Errors
    /// Returns [`ArenaError::InvalidBudget`] for malformed, zero, or
    /// overflowing values.
    pub fn parse(s: &str) -> Result<Self, ArenaError> {
        let trimmed = s.trim();
        let invalid = || ArenaError::InvalidBudget(trimmed.to_string());

        if trimmed.eq_ignore_ascii_case("unlimited") {
            return Ok(Self::unlimited());
        }

        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (digits, suffix) = trimmed.split_at(split);
        let unit = match suffix.trim().to_ascii_uppercase().as_str() {
            "" | "B" => 1,
            "K" | "KB" => KIB,
            "M" | "MB" => MIB,
            "G" | "GB" => GIB,
            _ => return Err(invalid()),
        };

        let value: usize = digits.parse().map_err(|_| invalid())?;
        match value.checked_mul(unit) {
            Some(0) | None => Err(invalid()),
            Some(bytes) => Ok(Self { bytes }),
        }
    }
}

impl Default for MemoryBudget {
    fn default() -> Self {
        Self::unlimited()
    }
}

impl fmt::Display for MemoryBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bytes {
            usize::MAX => write!(f, "unlimited"),
            b if b >= GIB && b % GIB == 0 => write!(f, "{} GB", b / GIB),
            b if b >= MIB && b % MIB == 0 => write!(f, "{} MB", b / MIB),
            b if b >= KIB && b % KIB == 0 => write!(f, "{} KB", b / KIB),
            b => write!(f, "{b} B"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_suffixes() {
        assert_eq!(MemoryBudget::parse("512").unwrap().as_bytes(), 512);
        assert_eq!(MemoryBudget::parse("512B").unwrap().as_bytes(), 512);
        assert_eq!(MemoryBudget::parse("4k").unwrap().as_bytes(), 4 * KIB);
        assert_eq!(MemoryBudget::parse("4KB").unwrap().as_bytes(), 4 * KIB);
        assert_eq!(MemoryBudget::parse("64M").unwrap().as_bytes(), 64 * MIB);
        assert_eq!(MemoryBudget::parse("64 mb").unwrap().as_bytes(), 64 * MIB);
        assert_eq!(MemoryBudget::parse("2G").unwrap().as_bytes(), 2 * GIB);
    }

    #[test]
    fn test_parse_unlimited() {
        assert!(MemoryBudget::parse(" Unlimited ").unwrap().is_unlimited());
        assert!(MemoryBudget::default().is_unlimited());
    }

    #[test]
    fn test_parse_invalid() {
        for bad in ["", "M", "abc", "0", "0M", "12T", "-4K", "1.5G"] {
            assert!(
                matches!(MemoryBudget::parse(bad), Err(ArenaError::InvalidBudget(_))),
                "{bad:?} should be rejected"
            );
        }
        assert!(MemoryBudget::parse(&format!("{}G", usize::MAX)).is_err());
    }

    #[test]
    fn test_admits() {
        let b = MemoryBudget::from_bytes(100);
        assert!(b.admits(100));
        assert!(!b.admits(101));
        assert!(MemoryBudget::unlimited().admits(usize::MAX));
    }

    #[test]
    fn test_display() {
        assert_eq!(MemoryBudget::from_mb(2048).to_string(), "2 GB");
        assert_eq!(MemoryBudget::from_mb(64).to_string(), "64 MB");
        assert_eq!(MemoryBudget::from_bytes(3 * KIB).to_string(), "3 KB");
        assert_eq!(MemoryBudget::from_bytes(100).to_string(), "100 B");
        assert_eq!(MemoryBudget::unlimited().to_string(), "unlimited");
    }

    #[test]
    fn test_serde_roundtrip() {
        let b = MemoryBudget::from_mb(16);
        let json = serde_json::to_string(&b).unwrap();
        let back: MemoryBudget = serde_json::from_str(&json).unwrap();
        assert_eq!(b, back);
    }
}
