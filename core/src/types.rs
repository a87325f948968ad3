//! Shared primitive types used by both pipeline stages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque transaction identifier. Never parsed or compared numerically.
pub type TxId = String;

/// Binary ground-truth label of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Label {
    Licit = 0,
    Illicit = 1,
}

impl Label {
    /// Map a raw Elliptic `class` value. Anything other than "1" or "2"
    /// (notably "unknown") is unresolved.
    pub fn from_raw_class(raw: &str) -> Option<Self> {
        match raw {
            "1" => Some(Self::Illicit),
            "2" => Some(Self::Licit),
            _ => None,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Licit),
            1 => Some(Self::Illicit),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub const ALL: [Label; 2] = [Label::Licit, Label::Illicit];
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}
