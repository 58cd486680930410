//! Engine configuration.

use crate::replica::{self, DEFAULT_REPLICA_ID_LENGTH};
use crate::{PositionSource, ReplicaId};
use serde::{Deserialize, Serialize};
use std::env;

/// Environment variable overriding the replica id length.
pub const REPLICA_ID_LENGTH_VAR: &str = "WEAVE_REPLICA_ID_LENGTH";

/// Settings for allocating replicas and their position sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Symbols per replica id. Each symbol carries 6 bits of entropy.
    pub replica_id_length: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            replica_id_length: DEFAULT_REPLICA_ID_LENGTH,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let replica_id_length = match lookup(REPLICA_ID_LENGTH_VAR) {
            None => DEFAULT_REPLICA_ID_LENGTH,
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(0) | Err(_) => return Err(ConfigError::InvalidReplicaIdLength(raw)),
                Ok(length) => length,
            },
        };

        Ok(Self { replica_id_length })
    }

    /// Override the replica id length.
    pub fn with_replica_id_length(mut self, length: usize) -> Self {
        self.replica_id_length = length;
        self
    }

    /// Entropy of one replica id, in bits.
    pub fn replica_id_bits(&self) -> usize {
        self.replica_id_length * 6
    }

    /// Allocate a replica id of the configured length.
    pub fn allocate_replica(&self) -> crate::Result<ReplicaId> {
        replica::generate(self.replica_id_length)
    }

    /// Allocate a replica id and wrap it in a fresh position source.
    pub fn new_source(&self) -> crate::Result<PositionSource> {
        Ok(PositionSource::new(self.allocate_replica()?))
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid WEAVE_REPLICA_ID_LENGTH value: {0:?}")]
    InvalidReplicaIdLength(String),
}
