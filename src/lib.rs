//! Core evaluation engine for prior-authorization coverage decisions.
//!
//! The engine scores clinical evidence quality, matches evidence against
//! weighted policy criteria through an external scoring collaborator, and
//! aggregates per-criterion results into an approve/deny/review
//! recommendation. Persistence, transport, and the collaborator backend are
//! supplied by the hosting workflow layer.

pub mod config;
pub mod telemetry;
pub mod workflows;
