//! Positions: densely ordered keys for sequence elements.
//!
//! A [`Position`] is either a finite key or the [`Position::End`] sentinel.
//! Finite keys are strings over a 64-symbol alphabet listed in ascending
//! ASCII order, so comparing two keys as plain strings gives the same answer
//! as comparing their digit sequences. That lets any store that sorts
//! strings byte-wise keep elements in sequence order.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// The key alphabet, in ascending order. Symbol `i` has digit value `i`.
pub const ALPHABET: &[u8; 64] =
    b"+-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Number of symbols in [`ALPHABET`].
pub const BASE: u8 = 64;

/// Storage encoding of [`Position::End`]. Sorts above every alphabet symbol.
pub const END_STORAGE: &str = "~";

/// Digit value of an alphabet symbol.
pub(crate) fn digit_of(symbol: u8) -> Option<u8> {
    match symbol {
        b'+' => Some(0),
        b'-' => Some(1),
        b'0'..=b'9' => Some(symbol - b'0' + 2),
        b'A'..=b'Z' => Some(symbol - b'A' + 12),
        b'a'..=b'z' => Some(symbol - b'a' + 38),
        _ => None,
    }
}

/// Check that `key` could have been produced by a position source.
///
/// Keys are non-empty, use only alphabet symbols and never end in the
/// minimum symbol (nothing would fit directly below such a key).
pub(crate) fn validate_key(key: &str) -> Result<()> {
    let Some(last) = key.bytes().last() else {
        return Err(Error::InvalidPosition("empty key".into()));
    };
    if let Some(c) = key.bytes().find(|b| digit_of(*b).is_none()) {
        return Err(Error::InvalidPosition(format!(
            "unexpected symbol {:?} in key {:?}",
            c as char, key
        )));
    }
    if last == ALPHABET[0] {
        return Err(Error::InvalidPosition(format!(
            "key {:?} ends in the minimum symbol",
            key
        )));
    }
    Ok(())
}

/// Digit values of an already validated key.
pub(crate) fn key_digits(key: &str) -> Vec<u8> {
    key.bytes().filter_map(digit_of).collect()
}

/// Render digit values as a key string.
pub(crate) fn digits_to_key(digits: &[u8]) -> String {
    digits
        .iter()
        .map(|d| ALPHABET[usize::from(*d)] as char)
        .collect()
}

/// An element's place in a sequence.
///
/// Ordering rules:
/// 1. Finite keys compare as strings
/// 2. `End` is greater than every finite key
///
/// `End` is only ever a bound or the end marker of a span, never the
/// position of a stored element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Position {
    Finite(String),
    End,
}

impl Position {
    /// Wrap a finite key, validating it.
    pub fn finite(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        validate_key(&key)?;
        Ok(Position::Finite(key))
    }

    /// Check that this position is well formed.
    pub fn validate(&self) -> Result<()> {
        match self {
            Position::Finite(key) => validate_key(key),
            Position::End => Ok(()),
        }
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Position::End)
    }

    /// The finite key, or `None` for `End`.
    pub fn key(&self) -> Option<&str> {
        match self {
            Position::Finite(key) => Some(key),
            Position::End => None,
        }
    }

    /// Encode for an ordinary string column.
    ///
    /// Storage strings sort exactly like the positions they encode.
    pub fn to_storage_string(&self) -> String {
        match self {
            Position::Finite(key) => key.clone(),
            Position::End => END_STORAGE.to_string(),
        }
    }

    /// Decode a string written by [`Position::to_storage_string`].
    pub fn from_storage_str(s: &str) -> Result<Self> {
        if s == END_STORAGE {
            return Ok(Position::End);
        }
        Self::finite(s)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Finite(key) => f.write_str(key),
            Position::End => f.write_str(END_STORAGE),
        }
    }
}

impl FromStr for Position {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_storage_str(s)
    }
}

impl Serialize for Position {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_storage_string())
    }
}

impl<'de> Deserialize<'de> for Position {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Position::from_storage_str(&s).map_err(serde::de::Error::custom)
    }
}
