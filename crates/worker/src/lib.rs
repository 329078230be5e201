//! Background persistence worker: periodically drains the Ephemeral
//! dirty-set into the Durable store under a lock, then conditionally
//! flushes ephemeral documents once durably persisted.

pub mod worker;

pub use worker::Worker;
