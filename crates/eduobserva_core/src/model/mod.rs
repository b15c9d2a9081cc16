//! Domain model for rubric, observations and AI artifacts.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep persisted and derived shapes in one place.
//!
//! # Invariants
//! - Criterion ids are the join key between rubric and observation scores.
//! - Observations are immutable once finalized.

pub mod chat;
pub mod observation;
pub mod report;
pub mod rubric;
