//! # Weave Engine
//!
//! Dense positions for collaborative sequences.
//!
//! Replicas that edit a shared list or text while offline need a way to
//! name "the place between these two elements" that never has to be
//! renumbered and that merges without coordination. This crate provides
//! that naming scheme and nothing else: storage, sync and conflict
//! resolution of rows stay with the caller's store.
//!
//! ## Design Principles
//!
//! - **No IO**: positions are pure values; generation never blocks
//! - **Dense**: a new position always fits between any two existing ones
//! - **Uncoordinated**: replicas generating in the same gap never collide
//! - **Store friendly**: positions sort as plain strings
//!
//! ## Core Concepts
//!
//! ### Replica ids
//!
//! A [`ReplicaId`] is a short random string (60 bits by default) allocated
//! once per session with [`replica::generate`] and owned by exactly one
//! [`PositionSource`].
//!
//! ### Positions
//!
//! A [`Position`] is either a finite key or [`Position::End`], which sorts
//! after every finite key and marks open-ended bounds.
//!
//! ### Position sources
//!
//! [`PositionSource::create_between`] returns a fresh position strictly
//! between two bounds. Keys carry the replica id and a per-source counter as
//! a suffix, which keeps positions from different replicas distinct.
//!
//! ### Sequences
//!
//! [`OrderedList`] and [`Text`] show the integration contract: one position
//! per element, moves as delete plus reinsert, and [`FormatSpan`]s over
//! `[start, end)` stamped with a [`LogicalClock`].
//!
//! ## Quick Start
//!
//! ```rust
//! use weave_engine::{PositionSource, ReplicaId, Text};
//!
//! // 1. Allocate a replica id for this session
//! let replica = ReplicaId::random().unwrap();
//! let mut source = PositionSource::new(replica);
//!
//! // 2. Generate positions directly
//! let first = source.create_between(None, None).unwrap();
//! let second = source.create_between(Some(&first), None).unwrap();
//! let middle = source.create_between(Some(&first), Some(&second)).unwrap();
//! assert!(first < middle && middle < second);
//!
//! // 3. Or let a sequence container do it
//! let mut text = Text::new();
//! text.insert_str(&mut source, 0, "hllo").unwrap();
//! text.insert_str(&mut source, 1, "e").unwrap();
//! assert_eq!(text.to_string(), "hello");
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod list;
pub mod position;
pub mod record;
pub mod replica;
pub mod source;
pub mod text;

// Re-export main types at crate root
pub use clock::LogicalClock;
pub use config::{ConfigError, EngineConfig};
pub use error::{Error, Result};
pub use list::OrderedList;
pub use position::Position;
pub use record::{FormatSpan, Row};
pub use replica::{ReplicaId, DEFAULT_REPLICA_ID_LENGTH};
pub use source::PositionSource;
pub use text::Text;
