//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds categorization                            │
//! │       │                  (unique / foreign key / busy / ...)            │
//! │       ▼                                                                 │
//! │  SaleError / ApiError ← Busy becomes a retryable conflict               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  HTTP status + generic message                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Duplicate SKU
    /// - Duplicate supplier name
    /// - Duplicate username or email
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Product names a supplier that does not exist
    /// - Deleting a product or user that recorded sales still reference
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// A row is still referenced and cannot be removed.
    #[error("{entity} {id} is still referenced by {count} {referenced_by}")]
    StillReferenced {
        entity: String,
        id: String,
        referenced_by: String,
        count: i64,
    },

    /// A stock adjustment would take the level below zero.
    #[error("Stock for product {product_id} cannot change by {delta}: only {available} on hand")]
    NegativeStock {
        product_id: String,
        available: i64,
        delta: i64,
    },

    /// A stock adjustment would push the level past what the column holds.
    #[error("Stock for product {product_id} cannot change by {delta}: {available} on hand would overflow")]
    StockOutOfRange {
        product_id: String,
        available: i64,
        delta: i64,
    },

    /// CHECK constraint or trigger refused the write.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// The database was locked by another writer past the busy timeout.
    ///
    /// ## When This Occurs
    /// Two units of work contend for the SQLite write lock. The sale
    /// coordinator retries these.
    #[error("Database busy: {0}")]
    Busy(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Stored data could not be mapped back to a domain value.
    #[error("Corrupt row in {table}: {reason}")]
    CorruptRow { table: String, reason: String },

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn corrupt(table: impl Into<String>, reason: impl Into<String>) -> Self {
        DbError::CorruptRow {
            table: table.into(),
            reason: reason.into(),
        }
    }

    /// Lock contention that a fresh attempt may get past.
    pub fn is_transient(&self) -> bool {
        matches!(self, DbError::Busy(_) | DbError::PoolExhausted)
    }

    /// Attaches the offending value to a unique violation on `field`.
    pub fn with_duplicate_value(self, value: impl Into<String>) -> Self {
        match self {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: value.into(),
            },
            other => other,
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → code / message decides:
///     SQLITE_BUSY, SQLITE_LOCKED, "database is locked" → Busy
///     "UNIQUE constraint failed: t.col"                → UniqueViolation(col)
///     "FOREIGN KEY constraint failed"                  → ForeignKeyViolation
///     "CHECK constraint failed", RAISE(ABORT)          → ConstraintViolation
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                let code = db_err.code();
                // Primary result code is the low byte of the extended code.
                let primary = code
                    .as_deref()
                    .and_then(|c| c.parse::<i32>().ok())
                    .map(|c| c & 0xff);

                if matches!(primary, Some(5) | Some(6)) || msg.contains("database is locked") {
                    DbError::Busy(msg.to_string())
                } else if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .map(|qualified| {
                            qualified
                                .rsplit('.')
                                .next()
                                .unwrap_or(qualified)
                                .to_string()
                        })
                        .unwrap_or_else(|| "unknown".to_string());
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("CHECK constraint failed")
                    || msg.contains("immutable")
                {
                    DbError::ConstraintViolation(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(DbError::Busy("database is locked".to_string()).is_transient());
        assert!(DbError::PoolExhausted.is_transient());
        assert!(!DbError::not_found("Product", "x").is_transient());
    }

    #[test]
    fn test_with_duplicate_value() {
        let err = DbError::duplicate("sku", "unknown").with_duplicate_value("BEAN-001");
        assert_eq!(err.to_string(), "Duplicate sku: 'BEAN-001' already exists");
    }
}
