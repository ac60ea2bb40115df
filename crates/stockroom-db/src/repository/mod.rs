//! # Repository Module
//!
//! Query surfaces over the Stockroom schema, one per aggregate.
//!
//! ```text
//! Handler
//!    │  db.products().list(&filter)
//!    ▼
//! ProductRepository ── SQL ──► SQLite
//! ```
//!
//! - [`ProductRepository`] - Catalog CRUD, paged listing, stock adjustments
//! - [`SupplierRepository`] - Supplier CRUD, delete guarded by references
//! - [`UserRepository`] - Accounts and credential lookup
//! - [`SaleRepository`] - Sale reads and the sales summary
//!
//! Sale writes do not go through a repository; they happen inside a
//! [`crate::unit_of_work::SaleUnitOfWork`].

pub mod product;
pub mod sale;
pub mod supplier;
pub mod user;

pub use product::ProductRepository;
pub use sale::SaleRepository;
pub use supplier::SupplierRepository;
pub use user::UserRepository;
