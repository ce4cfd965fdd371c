//! Calculation repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide keyed CRUD over the `calculations` table.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Write paths call `Calculation::validate()` before any SQL mutation.
//! - Each operation is one autocommit statement, so expression and result are
//!   always replaced together and a reported success is durable.
//! - Deleted rows stay behind as tombstones; their ids are never reused.
//! - Read paths reject invalid persisted rows instead of masking them.

use crate::db::migrations::latest_version;
use crate::db::{schema_version, DbError};
use crate::model::calculation::{Calculation, CalculationId, CalculationValidationError};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

const CALCULATIONS_TABLE: &str = "calculations";
const REQUIRED_COLUMNS: &[&str] = &["id", "expression", "result", "owner_id", "is_deleted"];

const CALCULATION_SELECT_SQL: &str = "SELECT
    id,
    expression,
    result,
    owner_id
FROM calculations";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for calculation persistence and queries.
#[derive(Debug)]
pub enum RepoError {
    Validation(CalculationValidationError),
    Db(DbError),
    NotFound(CalculationId),
    /// The id is already taken by a live or deleted record.
    Conflict(CalculationId),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Another thread panicked while holding the connection.
    LockPoisoned,
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "invalid calculation: {err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "calculation not found: {id}"),
            Self::Conflict(id) => write!(f, "calculation id already exists: {id}"),
            Self::InvalidData(message) => {
                write!(f, "invalid persisted calculation data: {message}")
            }
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}; open it with db::open_db"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
            Self::LockPoisoned => write!(f, "calculation store lock poisoned"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CalculationValidationError> for RepoError {
    fn from(value: CalculationValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Filter and pagination options for listing calculations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalculationListQuery {
    /// Only records owned by this user.
    pub owner_id: Option<String>,
    pub limit: Option<u32>,
    pub offset: u32,
}

impl CalculationListQuery {
    /// Lists every live record owned by `owner_id`.
    pub fn for_owner(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: Some(owner_id.into()),
            ..Self::default()
        }
    }
}

/// Storage capability set for calculation records.
///
/// Implementations must be safe to share between threads; every method is
/// atomic for the id it touches.
pub trait CalculationRepository: Send + Sync {
    /// Inserts a new record. Fails with `Conflict` when the id was ever used.
    fn create_calculation(&self, calculation: &Calculation) -> RepoResult<CalculationId>;
    /// Lists live records in creation order.
    fn list_calculations(&self, query: &CalculationListQuery) -> RepoResult<Vec<Calculation>>;
    fn get_calculation(&self, id: CalculationId) -> RepoResult<Calculation>;
    /// Replaces expression, result and owner of an existing record.
    fn update_calculation(&self, calculation: &Calculation) -> RepoResult<()>;
    /// Removes a live record. A second delete reports `NotFound`.
    fn delete_calculation(&self, id: CalculationId) -> RepoResult<()>;
}

/// SQLite-backed calculation repository.
///
/// Owns its connection; statements from concurrent callers are serialized
/// through an internal mutex.
pub struct SqliteCalculationRepository {
    conn: Mutex<Connection>,
}

impl SqliteCalculationRepository {
    /// Wraps a connection returned by [`crate::db::open_db`].
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations were not applied.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when the schema is
    ///   not the one this build expects.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        ensure_schema_ready(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| RepoError::LockPoisoned)
    }
}

impl CalculationRepository for SqliteCalculationRepository {
    fn create_calculation(&self, calculation: &Calculation) -> RepoResult<CalculationId> {
        calculation.validate()?;

        let conn = self.lock()?;
        let inserted = conn.execute(
            "INSERT INTO calculations (
                id,
                expression,
                result,
                owner_id
            ) VALUES (?1, ?2, ?3, ?4);",
            params![
                calculation.id.to_string(),
                calculation.expression.as_str(),
                calculation.result.as_str(),
                calculation.owner_id.as_deref(),
            ],
        );

        match inserted {
            Ok(_) => Ok(calculation.id),
            Err(err) if is_primary_key_conflict(&err) => Err(RepoError::Conflict(calculation.id)),
            Err(err) => Err(err.into()),
        }
    }

    fn list_calculations(&self, query: &CalculationListQuery) -> RepoResult<Vec<Calculation>> {
        let mut sql = format!("{CALCULATION_SELECT_SQL} WHERE is_deleted = 0");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(owner_id) = &query.owner_id {
            sql.push_str(" AND owner_id = ?");
            bind_values.push(Value::Text(owner_id.clone()));
        }

        sql.push_str(" ORDER BY rowid ASC");

        match (query.limit, query.offset) {
            (Some(limit), offset) => {
                sql.push_str(" LIMIT ? OFFSET ?");
                bind_values.push(Value::Integer(i64::from(limit)));
                bind_values.push(Value::Integer(i64::from(offset)));
            }
            (None, 0) => {}
            (None, offset) => {
                sql.push_str(" LIMIT -1 OFFSET ?");
                bind_values.push(Value::Integer(i64::from(offset)));
            }
        }

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut calculations = Vec::new();

        while let Some(row) = rows.next()? {
            calculations.push(parse_calculation_row(row)?);
        }

        Ok(calculations)
    }

    fn get_calculation(&self, id: CalculationId) -> RepoResult<Calculation> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "{CALCULATION_SELECT_SQL} WHERE id = ?1 AND is_deleted = 0;"
        ))?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return parse_calculation_row(row);
        }

        Err(RepoError::NotFound(id))
    }

    fn update_calculation(&self, calculation: &Calculation) -> RepoResult<()> {
        calculation.validate()?;

        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE calculations
             SET
                expression = ?1,
                result = ?2,
                owner_id = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?4 AND is_deleted = 0;",
            params![
                calculation.expression.as_str(),
                calculation.result.as_str(),
                calculation.owner_id.as_deref(),
                calculation.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(calculation.id));
        }

        Ok(())
    }

    fn delete_calculation(&self, id: CalculationId) -> RepoResult<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE calculations
             SET
                is_deleted = 1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1 AND is_deleted = 0;",
            [id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }
}

fn ensure_schema_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = schema_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let table_exists = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1;",
            [CALCULATIONS_TABLE],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if !table_exists {
        return Err(RepoError::MissingRequiredTable(CALCULATIONS_TABLE));
    }

    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1);")?;
    let columns = stmt
        .query_map([CALCULATIONS_TABLE], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    for &column in REQUIRED_COLUMNS {
        if !columns.iter().any(|name| name == column) {
            return Err(RepoError::MissingRequiredColumn {
                table: CALCULATIONS_TABLE,
                column,
            });
        }
    }

    Ok(())
}

fn is_primary_key_conflict(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

fn parse_calculation_row(row: &Row<'_>) -> RepoResult<Calculation> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{id_text}` in calculations.id"))
    })?;

    let calculation = Calculation {
        id,
        expression: row.get("expression")?,
        result: row.get("result")?,
        owner_id: row.get("owner_id")?,
    };
    calculation
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("calculation {id}: {err}")))?;
    Ok(calculation)
}
