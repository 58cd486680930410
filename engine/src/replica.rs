//! Replica identifiers and their allocator.
//!
//! A replica id names one session of one device. It is drawn from the same
//! 64-symbol alphabet as position keys, so the position source can embed it
//! verbatim as a tie-break suffix.

use crate::error::{Error, Result};
use crate::position::{digit_of, ALPHABET};
use rand_core::{CryptoRng, OsRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default length of a replica id, in symbols.
///
/// Each symbol carries 6 bits, so 10 symbols give 60 bits. That keeps the
/// chance of any collision under 1% across 10^8 documents with 10^4
/// replicas each.
pub const DEFAULT_REPLICA_ID_LENGTH: usize = 10;

/// Identifier of one replica (session/device).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReplicaId(String);

impl ReplicaId {
    /// Validate an id that was allocated earlier and persisted by the caller.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(Error::InvalidReplicaId("empty id".into()));
        }
        if let Some(c) = id.bytes().find(|b| digit_of(*b).is_none()) {
            return Err(Error::InvalidReplicaId(format!(
                "unexpected symbol {:?} in {:?}",
                c as char, id
            )));
        }
        Ok(Self(id))
    }

    /// Allocate a fresh id of the default length from the OS random source.
    pub fn random() -> Result<Self> {
        generate(DEFAULT_REPLICA_ID_LENGTH)
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of symbols in the id.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a validated id.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn digits(&self) -> Vec<u8> {
        self.0.bytes().filter_map(digit_of).collect()
    }
}

/// Allocate a replica id of `length` symbols from the OS random source.
pub fn generate(length: usize) -> Result<ReplicaId> {
    generate_with(&mut OsRng, length)
}

/// Allocate a replica id of `length` symbols from `rng`.
///
/// Each random byte is reduced modulo 64. Since 64 divides 256 the mapping
/// is unbiased; an alphabet of any other size would need rejection sampling.
/// A failing source is reported as [`Error::AllocatorUnavailable`] and never
/// replaced by a weaker one.
pub fn generate_with<R: RngCore + CryptoRng>(rng: &mut R, length: usize) -> Result<ReplicaId> {
    if length == 0 {
        return Err(Error::InvalidReplicaId("length must be at least 1".into()));
    }

    let mut bytes = vec![0u8; length];
    rng.try_fill_bytes(&mut bytes).map_err(|e| {
        tracing::error!(error = %e, "random source failed while allocating replica id");
        Error::AllocatorUnavailable(e.to_string())
    })?;

    let id: String = bytes
        .iter()
        .map(|b| ALPHABET[usize::from(b % 64)] as char)
        .collect();
    tracing::debug!(replica = %id, "allocated replica id");
    Ok(ReplicaId(id))
}

impl fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ReplicaId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for ReplicaId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for ReplicaId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ReplicaId> for String {
    fn from(id: ReplicaId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::num::NonZeroU32;

    /// A "cryptographic" source that always fails.
    struct BrokenRng;

    impl RngCore for BrokenRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0);
        }

        fn try_fill_bytes(
            &mut self,
            _dest: &mut [u8],
        ) -> std::result::Result<(), rand_core::Error> {
            let code = NonZeroU32::new(rand_core::Error::CUSTOM_START).unwrap();
            Err(rand_core::Error::from(code))
        }
    }

    impl CryptoRng for BrokenRng {}

    #[test]
    fn generates_requested_length() {
        for length in [1, 4, DEFAULT_REPLICA_ID_LENGTH, 32] {
            let id = generate(length).unwrap();
            assert_eq!(id.len(), length);
            assert!(id.as_str().bytes().all(|b| ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn random_uses_default_length() {
        let id = ReplicaId::random().unwrap();
        assert_eq!(id.len(), DEFAULT_REPLICA_ID_LENGTH);
    }

    #[test]
    fn ids_are_distinct() {
        let ids: HashSet<_> = (0..1000).map(|_| ReplicaId::random().unwrap()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn symbols_are_roughly_uniform() {
        let mut counts = [0usize; 64];
        for _ in 0..10_000 {
            let id = generate(10).unwrap();
            assert_eq!(id.len(), 10);
            for b in id.as_str().bytes() {
                counts[usize::from(digit_of(b).unwrap())] += 1;
            }
        }
        // 100_000 draws over 64 symbols: expect ~1562 each, sigma ~39.
        for (digit, count) in counts.iter().enumerate() {
            assert!(
                (1200..=1950).contains(count),
                "symbol {} drawn {} times",
                ALPHABET[digit] as char,
                count
            );
        }
    }

    #[test]
    fn zero_length_rejected() {
        assert!(matches!(generate(0), Err(Error::InvalidReplicaId(_))));
    }

    #[test]
    fn broken_source_fails_loudly() {
        let err = generate_with(&mut BrokenRng, 10).unwrap_err();
        assert!(matches!(err, Error::AllocatorUnavailable(_)));
    }

    #[test]
    fn validates_persisted_ids() {
        assert!(ReplicaId::new("abc-+09XY").is_ok());
        assert!(ReplicaId::new("").is_err());
        assert!(ReplicaId::new("has space").is_err());
        assert!(ReplicaId::new("tilde~").is_err());
        assert!("node_1".parse::<ReplicaId>().is_err());
    }

    #[test]
    fn serialization_roundtrip() {
        let id = ReplicaId::new("Qx-7+aZ09b").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"Qx-7+aZ09b\"");
        let parsed: ReplicaId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);

        assert!(serde_json::from_str::<ReplicaId>("\"bad id\"").is_err());
    }
}
