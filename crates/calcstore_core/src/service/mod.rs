//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate evaluator and repository calls into use-case level APIs.
//! - Keep boundary layers (CLI) decoupled from storage details.

pub mod calculation_service;
