//! # Error Types
//!
//! Domain-specific error types for stockroom-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stockroom-core errors (this file)                                      │
//! │  ├── CoreError        - Domain rule failures (stock, pricing)           │
//! │  └── ValidationError  - Input validation failures                       │
//! │  stockroom-core::access                                                 │
//! │  └── AccessDenied     - Role lacks a capability                         │
//! │                                                                         │
//! │  stockroom-db errors (separate crate)                                   │
//! │  ├── DbError          - Database operation failures                     │
//! │  └── SaleError        - Sale transaction outcome taxonomy               │
//! │                                                                         │
//! │  HTTP API errors (in app)                                               │
//! │  └── ApiError         - What clients see (status + code + message)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::password::PasswordHashError;

// =============================================================================
// Core Error
// =============================================================================

/// Domain rule violations raised by pure logic.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced product does not exist or is no longer sold.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Requested quantity exceeds what is on hand.
    ///
    /// ## When This Occurs
    /// `requested` is the total across every line naming the product, so two
    /// lines of 6 and 5 against a stock of 10 fail here with `requested: 11`.
    #[error("Insufficient stock for {product_name}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        product_name: String,
        available: i64,
        requested: i64,
    },

    /// An amount left the representable range.
    #[error("Amount overflow while computing {context}")]
    AmountOverflow { context: String },

    /// Password hashing capability failed.
    #[error("Password hashing failed: {0}")]
    PasswordHash(#[from] PasswordHashError),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// A list that must have entries was empty.
    #[error("{field} must contain at least one entry")]
    Empty { field: String },

    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

pub type CoreResult<T> = Result<T, CoreError>;
