// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Database privileges

use serde::{Deserialize, Serialize};
use std::fmt;

/// Privilege bitmask over {read, write}
///
/// `All` is exactly `Read | Write`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Privilege {
    #[default]
    None,
    Read,
    Write,
    All,
}

impl Privilege {
    const READ_BIT: u8 = 0b01;
    const WRITE_BIT: u8 = 0b10;

    pub fn bits(self) -> u8 {
        match self {
            Privilege::None => 0,
            Privilege::Read => Self::READ_BIT,
            Privilege::Write => Self::WRITE_BIT,
            Privilege::All => Self::READ_BIT | Self::WRITE_BIT,
        }
    }

    pub fn from_bits(bits: u8) -> Self {
        match bits & (Self::READ_BIT | Self::WRITE_BIT) {
            0 => Privilege::None,
            Self::READ_BIT => Privilege::Read,
            Self::WRITE_BIT => Privilege::Write,
            _ => Privilege::All,
        }
    }

    /// Bit clear: `self & !other`
    pub fn and_not(self, other: Privilege) -> Self {
        Self::from_bits(self.bits() & !other.bits())
    }

    pub fn union(self, other: Privilege) -> Self {
        Self::from_bits(self.bits() | other.bits())
    }

    /// True if every bit of `other` is granted by `self`
    pub fn contains(self, other: Privilege) -> bool {
        self.bits() & other.bits() == other.bits()
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Privilege::None => "NO PRIVILEGES",
            Privilege::Read => "READ",
            Privilege::Write => "WRITE",
            Privilege::All => "ALL PRIVILEGES",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_clear() {
        assert_eq!(Privilege::All.and_not(Privilege::Write), Privilege::Read);
        assert_eq!(Privilege::All.and_not(Privilege::All), Privilege::None);
        assert_eq!(Privilege::Read.and_not(Privilege::Write), Privilege::Read);
        assert_eq!(Privilege::None.and_not(Privilege::Read), Privilege::None);
    }

    #[test]
    fn test_union_and_contains() {
        assert_eq!(Privilege::Read.union(Privilege::Write), Privilege::All);
        assert!(Privilege::All.contains(Privilege::Write));
        assert!(!Privilege::Read.contains(Privilege::Write));
        assert!(Privilege::Read.contains(Privilege::None));
    }
}
