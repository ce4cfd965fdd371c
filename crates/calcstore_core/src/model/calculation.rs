//! Calculation domain model.
//!
//! # Responsibility
//! - Define the persisted expression/result pair and its identity.
//! - Validate record shape before any persistence path touches storage.
//!
//! # Invariants
//! - `id` is stable and never reused for another calculation.
//! - `expression` is never blank and `result` is never empty.
//! - `owner_id`, when present, is a non-blank opaque user identifier.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of a persisted calculation.
pub type CalculationId = Uuid;

/// Persisted unit: the verbatim expression and its canonical result text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calculation {
    /// Generated once at creation time.
    pub id: CalculationId,
    /// Original user text, stored verbatim.
    pub expression: String,
    /// Canonical rendering of the evaluated value.
    pub result: String,
    /// Owning user; `None` for anonymous calculations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
}

/// Record-shape violations detected by [`Calculation::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalculationValidationError {
    EmptyExpression,
    EmptyResult,
    BlankOwner,
}

impl Display for CalculationValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyExpression => write!(f, "expression must not be blank"),
            Self::EmptyResult => write!(f, "result must not be empty"),
            Self::BlankOwner => write!(f, "owner_id must not be blank when present"),
        }
    }
}

impl Error for CalculationValidationError {}

impl Calculation {
    /// Builds a record with a caller-provided id.
    ///
    /// The constructor does not validate; write paths call [`Self::validate`].
    pub fn with_id(
        id: CalculationId,
        expression: impl Into<String>,
        result: impl Into<String>,
        owner_id: Option<String>,
    ) -> Self {
        Self {
            id,
            expression: expression.into(),
            result: result.into(),
            owner_id,
        }
    }

    /// Checks the record shape invariants.
    pub fn validate(&self) -> Result<(), CalculationValidationError> {
        if self.expression.trim().is_empty() {
            return Err(CalculationValidationError::EmptyExpression);
        }
        if self.result.is_empty() {
            return Err(CalculationValidationError::EmptyResult);
        }
        if matches!(self.owner_id.as_deref(), Some(owner) if owner.trim().is_empty()) {
            return Err(CalculationValidationError::BlankOwner);
        }
        Ok(())
    }

    /// Returns whether this record belongs to `owner_id`.
    pub fn is_owned_by(&self, owner_id: &str) -> bool {
        self.owner_id.as_deref() == Some(owner_id)
    }
}
