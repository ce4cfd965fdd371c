//! Domain model for persisted calculations.
//!
//! # Responsibility
//! - Define the canonical record written by the service and read by callers.
//!
//! # Invariants
//! - Every calculation is identified by a stable `CalculationId`.
//! - `expression` and `result` are always written together.

pub mod calculation;
