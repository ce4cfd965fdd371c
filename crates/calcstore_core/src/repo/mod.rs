//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the storage capability set the service depends on.
//! - Isolate SQLite query details from orchestration.
//!
//! # Invariants
//! - Repository writes enforce `Calculation::validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`, `Conflict`) in
//!   addition to DB transport errors.

pub mod calculation_repo;
pub mod memory_repo;
