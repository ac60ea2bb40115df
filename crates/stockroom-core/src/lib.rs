//! # stockroom-core: Pure Domain Logic for Stockroom
//!
//! This crate is the **heart** of Stockroom, a single-tenant inventory and
//! sales backend. It holds every business rule as a pure function with zero
//! I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockroom Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                    stockroom-api (axum)                         │    │
//! │  │   login ─► auth middleware ─► capability check ─► handlers      │    │
//! │  └─────────────────────────────┬───────────────────────────────────┘    │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐    │
//! │  │             stockroom-db (SQLite + sale coordinator)            │    │
//! │  │   repositories, unit of work, retry on lock contention          │    │
//! │  └─────────────────────────────┬───────────────────────────────────┘    │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐    │
//! │  │             ★ stockroom-core (THIS CRATE) ★                     │    │
//! │  │                                                                 │    │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐   │    │
//! │  │   │  types  │ │  money  │ │  sale   │ │ access  │ │ report  │   │    │
//! │  │   │ Product │ │  Money  │ │ pricing │ │ roles × │ │ periods │   │    │
//! │  │   │  Sale   │ │ round2  │ │ demand  │ │ actions │ │  rows   │   │    │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘   │    │
//! │  │                                                                 │    │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entities and their input/update forms
//! - [`money`] - Fixed-point money (4 decimal places, totals rounded to cents)
//! - [`sale`] - Sale request validation, aggregation and pricing
//! - [`access`] - Role capability table
//! - [`report`] - Report periods and rows
//! - [`password`] - Pluggable password hashing capability
//! - [`validation`] - Field rules
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use stockroom_core::sale::{SaleLineRequest, SaleRequest};
//!
//! let request = SaleRequest::new(vec![
//!     SaleLineRequest::new("p-1", 6),
//!     SaleLineRequest::new("p-1", 5),
//! ]);
//! request.validate().unwrap();
//!
//! // Duplicate lines are checked against stock as one demand of 11.
//! assert_eq!(request.aggregated_quantities().unwrap(), vec![("p-1".to_string(), 11)]);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod access;
pub mod error;
pub mod money;
pub mod password;
pub mod report;
pub mod sale;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use access::{authorize, AccessDenied, Action};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use password::{PasswordHashError, PasswordHasher};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Customer name recorded when a sale names none.
pub const DEFAULT_CUSTOMER_NAME: &str = "Walk-in Customer";

/// Reorder threshold for products created without one.
pub const DEFAULT_MIN_STOCK_LEVEL: i64 = 10;
