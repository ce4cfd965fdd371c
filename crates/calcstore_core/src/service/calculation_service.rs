//! Calculation use-case service.
//!
//! # Responsibility
//! - Run validate -> evaluate -> persist for every write.
//! - Generate record identity and retry once on an id collision.
//! - Map evaluator and repository faults to service-level outcomes.
//!
//! # Invariants
//! - A failed validation or evaluation never touches storage.
//! - `update_calculation` preserves `id` and `owner_id`.
//! - Expression text is never logged; only its length is.

use crate::eval::{evaluate, EvalError, Evaluation};
use crate::model::calculation::{Calculation, CalculationId};
use crate::repo::calculation_repo::{CalculationListQuery, CalculationRepository, RepoError};
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Source of fresh calculation ids.
pub type IdGenerator = Box<dyn Fn() -> CalculationId + Send + Sync>;

/// Pipeline stage that produced a [`ServiceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultStage {
    Validation,
    Evaluation,
    Persistence,
}

impl FaultStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Evaluation => "evaluation",
            Self::Persistence => "persistence",
        }
    }
}

/// Service error for calculation use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Input rejected before evaluation.
    Validation(String),
    /// Expression could not be evaluated; nothing was persisted.
    Calculation(EvalError),
    NotFound(CalculationId),
    /// Id collision persisted after one regeneration.
    Conflict(CalculationId),
    /// Any other persistence failure.
    Storage(RepoError),
}

impl ServiceError {
    pub fn stage(&self) -> FaultStage {
        match self {
            Self::Validation(_) => FaultStage::Validation,
            Self::Calculation(_) => FaultStage::Evaluation,
            Self::NotFound(_) | Self::Conflict(_) | Self::Storage(_) => FaultStage::Persistence,
        }
    }

    /// Stable machine-readable code used in logs and by boundary layers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "invalid_input",
            Self::Calculation(EvalError::Syntax { .. }) => "syntax_error",
            Self::Calculation(EvalError::DivisionByZero) => "division_by_zero",
            Self::Calculation(EvalError::Overflow) => "overflow",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Storage(_) => "storage_error",
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(message) => write!(f, "invalid input: {message}"),
            Self::Calculation(err) => write!(f, "calculation failed: {err}"),
            Self::NotFound(id) => write!(f, "calculation not found: {id}"),
            Self::Conflict(id) => write!(f, "calculation id already exists: {id}"),
            Self::Storage(err) => write!(f, "storage failed: {err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Calculation(err) => Some(err),
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::Conflict(id) => Self::Conflict(id),
            RepoError::Validation(err) => Self::Validation(err.to_string()),
            other => Self::Storage(other),
        }
    }
}

impl From<EvalError> for ServiceError {
    fn from(value: EvalError) -> Self {
        Self::Calculation(value)
    }
}

/// Calculation service facade over a repository implementation.
pub struct CalculationService<R: CalculationRepository> {
    repo: R,
    next_id: IdGenerator,
}

impl<R: CalculationRepository> CalculationService<R> {
    /// Creates a service that issues random v4 UUIDs.
    pub fn new(repo: R) -> Self {
        Self::with_id_generator(repo, Box::new(Uuid::new_v4))
    }

    /// Creates a service with a caller-provided id source.
    pub fn with_id_generator(repo: R, next_id: IdGenerator) -> Self {
        Self { repo, next_id }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Evaluates without persisting anything.
    pub fn evaluate_expression(&self, expression: &str) -> ServiceResult<Evaluation> {
        let started_at = Instant::now();
        let outcome = validated_evaluation(expression);
        match &outcome {
            Ok(_) => debug!(
                "event=calculation_eval module=service status=ok expression_len={} duration_ms={}",
                expression.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => log_failure("calculation_eval", started_at, err),
        }
        outcome
    }

    /// Evaluates `expression` and stores it as a new record.
    ///
    /// # Errors
    /// - `Validation` for a blank expression or blank owner.
    /// - `Calculation` when evaluation faults; nothing is stored.
    /// - `Conflict` when two generated ids in a row are already taken.
    pub fn create_calculation(
        &self,
        expression: &str,
        owner_id: Option<&str>,
    ) -> ServiceResult<Calculation> {
        let started_at = Instant::now();
        let outcome = self.create_inner(expression, owner_id);
        match &outcome {
            Ok(calculation) => info!(
                "event=calculation_create module=service status=ok id={} owned={} expression_len={} duration_ms={}",
                calculation.id,
                calculation.owner_id.is_some(),
                expression.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => log_failure("calculation_create", started_at, err),
        }
        outcome
    }

    fn create_inner(&self, expression: &str, owner_id: Option<&str>) -> ServiceResult<Calculation> {
        if matches!(owner_id, Some(owner) if owner.trim().is_empty()) {
            return Err(ServiceError::Validation(
                "owner_id must not be blank when present".to_string(),
            ));
        }
        let evaluation = validated_evaluation(expression)?;

        let mut calculation = Calculation::with_id(
            (self.next_id)(),
            expression,
            evaluation.text,
            owner_id.map(str::to_string),
        );

        match self.repo.create_calculation(&calculation) {
            Ok(_) => {}
            Err(RepoError::Conflict(taken)) => {
                warn!(
                    "event=calculation_create module=service status=retry reason=id_conflict id={taken}"
                );
                calculation.id = (self.next_id)();
                self.repo.create_calculation(&calculation)?;
            }
            Err(err) => return Err(err.into()),
        }

        Ok(calculation)
    }

    /// Lists every live record, optionally only those of one owner.
    pub fn get_all_calculations(&self, owner_id: Option<&str>) -> ServiceResult<Vec<Calculation>> {
        let query = CalculationListQuery {
            owner_id: owner_id.map(str::to_string),
            ..CalculationListQuery::default()
        };
        self.list_calculations(&query)
    }

    /// Lists live records using filter and pagination options.
    pub fn list_calculations(
        &self,
        query: &CalculationListQuery,
    ) -> ServiceResult<Vec<Calculation>> {
        let started_at = Instant::now();
        let outcome = self.repo.list_calculations(query).map_err(ServiceError::from);
        match &outcome {
            Ok(items) => debug!(
                "event=calculation_list module=service status=ok count={} filtered={} duration_ms={}",
                items.len(),
                query.owner_id.is_some(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => log_failure("calculation_list", started_at, err),
        }
        outcome
    }

    pub fn get_calculation_by_id(&self, id: CalculationId) -> ServiceResult<Calculation> {
        self.repo.get_calculation(id).map_err(ServiceError::from)
    }

    /// Re-evaluates and replaces the expression/result of an existing record.
    ///
    /// The stored record is left unchanged when validation or evaluation
    /// fails.
    pub fn update_calculation(
        &self,
        id: CalculationId,
        expression: &str,
    ) -> ServiceResult<Calculation> {
        let started_at = Instant::now();
        let outcome = self.update_inner(id, expression);
        match &outcome {
            Ok(_) => info!(
                "event=calculation_update module=service status=ok id={} expression_len={} duration_ms={}",
                id,
                expression.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => log_failure("calculation_update", started_at, err),
        }
        outcome
    }

    fn update_inner(&self, id: CalculationId, expression: &str) -> ServiceResult<Calculation> {
        let evaluation = validated_evaluation(expression)?;
        let current = self.repo.get_calculation(id)?;

        let replacement = Calculation::with_id(id, expression, evaluation.text, current.owner_id);
        self.repo.update_calculation(&replacement)?;
        Ok(replacement)
    }

    pub fn delete_calculation(&self, id: CalculationId) -> ServiceResult<()> {
        let started_at = Instant::now();
        let outcome = self.repo.delete_calculation(id).map_err(ServiceError::from);
        match &outcome {
            Ok(()) => info!(
                "event=calculation_delete module=service status=ok id={} duration_ms={}",
                id,
                started_at.elapsed().as_millis()
            ),
            Err(err) => log_failure("calculation_delete", started_at, err),
        }
        outcome
    }
}

fn validated_evaluation(expression: &str) -> ServiceResult<Evaluation> {
    if expression.trim().is_empty() {
        return Err(ServiceError::Validation(
            "expression must not be blank".to_string(),
        ));
    }
    Ok(evaluate(expression)?)
}

fn log_failure(event: &str, started_at: Instant, err: &ServiceError) {
    if let ServiceError::Storage(source) = err {
        error!(
            "event={event} module=service status=error stage={} error_code={} duration_ms={} error={}",
            err.stage().as_str(),
            err.code(),
            started_at.elapsed().as_millis(),
            source
        );
        return;
    }
    warn!(
        "event={event} module=service status=rejected stage={} error_code={} duration_ms={}",
        err.stage().as_str(),
        err.code(),
        started_at.elapsed().as_millis()
    );
}

#[cfg(test)]
mod tests {
    use super::{CalculationService, FaultStage, ServiceError};
    use crate::db::DbError;
    use crate::eval::EvalError;
    use crate::model::calculation::{Calculation, CalculationId};
    use crate::repo::calculation_repo::{
        CalculationListQuery, CalculationRepository, RepoError, RepoResult,
    };
    use crate::repo::memory_repo::InMemoryCalculationRepository;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    /// Repository whose every call fails with a transport error.
    struct FailingRepository;

    fn transport_error() -> RepoError {
        RepoError::Db(DbError::Sqlite(rusqlite::Error::InvalidQuery))
    }

    impl CalculationRepository for FailingRepository {
        fn create_calculation(&self, _: &Calculation) -> RepoResult<CalculationId> {
            Err(transport_error())
        }
        fn list_calculations(&self, _: &CalculationListQuery) -> RepoResult<Vec<Calculation>> {
            Err(transport_error())
        }
        fn get_calculation(&self, _: CalculationId) -> RepoResult<Calculation> {
            Err(transport_error())
        }
        fn update_calculation(&self, _: &Calculation) -> RepoResult<()> {
            Err(transport_error())
        }
        fn delete_calculation(&self, _: CalculationId) -> RepoResult<()> {
            Err(transport_error())
        }
    }

    fn scripted_ids(ids: Vec<CalculationId>) -> super::IdGenerator {
        let cursor = AtomicUsize::new(0);
        Box::new(move || {
            let index = cursor.fetch_add(1, Ordering::SeqCst);
            ids.get(index).copied().unwrap_or_else(Uuid::new_v4)
        })
    }

    #[test]
    fn create_evaluates_and_persists() {
        let service = CalculationService::new(InMemoryCalculationRepository::new());

        let created = service.create_calculation("10+5", None).unwrap();
        assert_eq!(created.expression, "10+5");
        assert_eq!(created.result, "15");
        assert_eq!(service.get_calculation_by_id(created.id).unwrap(), created);
    }

    #[test]
    fn blank_expression_is_a_validation_fault() {
        let service = CalculationService::new(InMemoryCalculationRepository::new());

        let err = service.create_calculation("  \t", None).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(err.stage(), FaultStage::Validation);
        assert!(service.repository().is_empty().unwrap());
    }

    #[test]
    fn blank_owner_is_a_validation_fault() {
        let service = CalculationService::new(InMemoryCalculationRepository::new());
        let err = service.create_calculation("1+1", Some("")).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn evaluation_fault_persists_nothing() {
        let service = CalculationService::new(InMemoryCalculationRepository::new());

        let err = service
            .create_calculation("invalid expression", None)
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Calculation(EvalError::Syntax { .. })
        ));
        assert_eq!(err.stage(), FaultStage::Evaluation);
        assert_eq!(err.code(), "syntax_error");

        let err = service.create_calculation("10/0", None).unwrap_err();
        assert_eq!(err.code(), "division_by_zero");
        assert!(service.repository().is_empty().unwrap());
    }

    #[test]
    fn id_collision_is_retried_once() {
        let repo = InMemoryCalculationRepository::new();
        let taken = Uuid::new_v4();
        repo.create_calculation(&Calculation::with_id(taken, "1", "1", None))
            .unwrap();
        let fresh = Uuid::new_v4();

        let service =
            CalculationService::with_id_generator(repo, scripted_ids(vec![taken, fresh]));
        let created = service.create_calculation("2*3", None).unwrap();

        assert_eq!(created.id, fresh);
        assert_eq!(service.repository().len().unwrap(), 2);
    }

    #[test]
    fn repeated_id_collision_fails_with_conflict() {
        let repo = InMemoryCalculationRepository::new();
        let taken = Uuid::new_v4();
        repo.create_calculation(&Calculation::with_id(taken, "1", "1", None))
            .unwrap();

        let service =
            CalculationService::with_id_generator(repo, scripted_ids(vec![taken, taken]));
        let err = service.create_calculation("2*3", None).unwrap_err();

        assert!(matches!(err, ServiceError::Conflict(id) if id == taken));
        assert_eq!(err.stage(), FaultStage::Persistence);
        assert_eq!(service.repository().len().unwrap(), 1);
    }

    #[test]
    fn update_keeps_identity_and_owner() {
        let service = CalculationService::new(InMemoryCalculationRepository::new());
        let created = service.create_calculation("1+1", Some("user-7")).unwrap();

        let updated = service.update_calculation(created.id, "100+50").unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.result, "150");
        assert_eq!(updated.owner_id.as_deref(), Some("user-7"));
        assert_eq!(service.get_calculation_by_id(created.id).unwrap(), updated);
    }

    #[test]
    fn failed_update_leaves_record_untouched() {
        let service = CalculationService::new(InMemoryCalculationRepository::new());
        let created = service.create_calculation("1+1", None).unwrap();

        let err = service.update_calculation(created.id, "bad(").unwrap_err();
        assert!(matches!(err, ServiceError::Calculation(_)));
        let err = service.update_calculation(created.id, "").unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let stored = service.get_calculation_by_id(created.id).unwrap();
        assert_eq!(stored.expression, "1+1");
        assert_eq!(stored.result, "2");
    }

    #[test]
    fn update_of_missing_record_is_not_found() {
        let service = CalculationService::new(InMemoryCalculationRepository::new());
        let missing = Uuid::new_v4();
        let err = service.update_calculation(missing, "50-10").unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(id) if id == missing));
    }

    #[test]
    fn second_delete_is_not_found() {
        let service = CalculationService::new(InMemoryCalculationRepository::new());
        let created = service.create_calculation("5*5", None).unwrap();

        service.delete_calculation(created.id).unwrap();
        let err = service.delete_calculation(created.id).unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(id) if id == created.id));
    }

    #[test]
    fn storage_failures_surface_as_persistence_faults() {
        let service = CalculationService::new(FailingRepository);

        let err = service.create_calculation("20*2", None).unwrap_err();
        assert!(matches!(err, ServiceError::Storage(_)));
        assert_eq!(err.stage(), FaultStage::Persistence);

        assert!(matches!(
            service.get_all_calculations(None).unwrap_err(),
            ServiceError::Storage(_)
        ));
        assert!(matches!(
            service.delete_calculation(Uuid::new_v4()).unwrap_err(),
            ServiceError::Storage(_)
        ));
    }

    #[test]
    fn evaluation_never_reaches_storage_for_bad_input() {
        let service = CalculationService::new(FailingRepository);
        let err = service.update_calculation(Uuid::new_v4(), "2+").unwrap_err();
        assert!(matches!(err, ServiceError::Calculation(_)));
    }

    #[test]
    fn evaluate_expression_does_not_persist() {
        let service = CalculationService::new(InMemoryCalculationRepository::new());
        let evaluation = service.evaluate_expression("7/2").unwrap();
        assert_eq!(evaluation.text, "3.5");
        assert!(service.repository().is_empty().unwrap());
    }
}
