//! Shared types and pure logic for the worldgate command gateway.
//!
//! This crate holds everything that never touches I/O: the entity model,
//! the error taxonomy other crates hang their variants off of, key
//! namespacing, input validation, and version-diff computation.

pub mod affinity;
pub mod config;
pub mod diff;
pub mod entity;
pub mod error;
pub mod events;
pub mod keygen;
pub mod limits;
pub mod merge;
pub mod validate;

pub use affinity::AffinityLookup;
pub use config::GatewayConfig;
pub use entity::{AttributeValue, Entity, EntityId, EntityKind, RankScores, NULL_MARKER};
pub use error::{GatewayError, ValidationError};
pub use events::ChangeEventSink;
pub use merge::{RankEntryUpdate, RankScoreUpdate, RankTypeUpdate};
