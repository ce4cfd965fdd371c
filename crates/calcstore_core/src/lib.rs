//! Core calculation pipeline for calcstore.
//!
//! Evaluates arithmetic expressions, persists expression/result pairs, and
//! keeps CRUD consistency for them. Boundary layers (CLI) depend only on the
//! re-exports below.

pub mod db;
pub mod eval;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use eval::{evaluate, format_value, EvalError, Evaluation, FaultKind};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::calculation::{Calculation, CalculationId, CalculationValidationError};
pub use repo::calculation_repo::{
    CalculationListQuery, CalculationRepository, RepoError, RepoResult,
    SqliteCalculationRepository,
};
pub use repo::memory_repo::InMemoryCalculationRepository;
pub use service::calculation_service::{
    CalculationService, FaultStage, IdGenerator, ServiceError, ServiceResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
