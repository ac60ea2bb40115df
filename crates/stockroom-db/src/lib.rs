//! # stockroom-db: Database Layer for Stockroom
//!
//! SQLite storage for the catalog and the sale ledger, plus the sale
//! transaction coordinator that ties them together.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockroom Data Flow                              │
//! │                                                                         │
//! │  axum handler (POST /api/sales)                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                   stockroom-db (THIS CRATE)                     │    │
//! │  │                                                                 │    │
//! │  │   ┌─────────────────┐  ┌────────────────┐  ┌──────────────┐     │    │
//! │  │   │ SaleCoordinator │─►│ SaleUnitOfWork │  │ Repositories │     │    │
//! │  │   │ retry / backoff │  │ (one tx)       │  │ product, ... │     │    │
//! │  │   └─────────────────┘  └───────┬────────┘  └──────┬───────┘     │    │
//! │  │                                ▼                  ▼             │    │
//! │  │                     Database (pool.rs) ─ SqlitePool, WAL        │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//! - [`unit_of_work`] - Transactional sale store contract
//! - [`sale_transaction`] - Sale coordinator and its error type
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockroom_db::{Database, DbConfig, SaleCoordinator};
//!
//! let db = Database::new(DbConfig::new("./stockroom.db")).await?;
//! let coordinator = SaleCoordinator::new(db.sale_store());
//! let sale = coordinator.record_sale(&request, &user_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod sale_transaction;
pub mod unit_of_work;

#[cfg(test)]
mod test_support;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::{ProductRepository, SaleRepository, SupplierRepository, UserRepository};
pub use sale_transaction::{RetryPolicy, SaleCoordinator, SaleError};
pub use unit_of_work::{SaleStore, SaleUnitOfWork, SqliteSaleStore, StockDecrement};
