//! # Sale Unit of Work
//!
//! The transactional contract the sale coordinator runs against, and its
//! SQLite implementation.
//!
//! ## Lifecycle
//! ```text
//! SaleStore::begin()
//!      │
//!      ▼
//! lock_products(ids)      ← write lock taken here, held until the end
//!      │
//!      ▼
//! decrement_stock(id, q)  ← conditional: never below zero
//!      │  (× distinct products)
//!      ▼
//! insert_sale(&sale)
//!      │
//!      ├── commit()   → every write lands together
//!      └── rollback() → nothing lands
//!
//! Dropping the unit without either is a rollback.
//! ```
//!
//! ## Locking
//! SQLite allows one writer at a time. Taking the write lock with the very
//! first statement means the product rows read afterwards cannot change
//! until this unit ends. A second sale (or a price edit) blocks on the busy
//! timeout and either proceeds after us or fails with `DbError::Busy`.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};
use tracing::debug;

use crate::error::DbResult;
use crate::repository::product::{ProductRow, PRODUCT_COLUMNS};
use crate::repository::sale::insert_sale_rows;
use stockroom_core::{Product, Sale};

// =============================================================================
// Contract
// =============================================================================

/// Result of a conditional stock decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockDecrement {
    /// Stock was reduced.
    Applied,
    /// Not enough on hand; nothing changed.
    Insufficient { available: i64 },
    /// No such product.
    Missing,
}

/// Opens sale units of work.
#[async_trait]
pub trait SaleStore: Send + Sync {
    type Unit: SaleUnitOfWork;

    async fn begin(&self) -> DbResult<Self::Unit>;
}

/// One all-or-nothing sale write.
#[async_trait]
pub trait SaleUnitOfWork: Send {
    /// Reads the given products under the unit's write lock.
    ///
    /// Ids that do not exist are simply absent from the result.
    async fn lock_products(&mut self, ids: &[String]) -> DbResult<Vec<Product>>;

    /// `stock -= quantity` if and only if `stock >= quantity`.
    async fn decrement_stock(&mut self, product_id: &str, quantity: i64)
        -> DbResult<StockDecrement>;

    /// Writes the sale header and its lines.
    async fn insert_sale(&mut self, sale: &Sale) -> DbResult<()>;

    async fn commit(self) -> DbResult<()>;

    async fn rollback(self) -> DbResult<()>;
}

// =============================================================================
// SQLite Implementation
// =============================================================================

/// [`SaleStore`] over the shared SQLite pool.
#[derive(Debug, Clone)]
pub struct SqliteSaleStore {
    pool: SqlitePool,
}

impl SqliteSaleStore {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteSaleStore { pool }
    }
}

#[async_trait]
impl SaleStore for SqliteSaleStore {
    type Unit = SqliteUnitOfWork;

    async fn begin(&self) -> DbResult<SqliteUnitOfWork> {
        let tx = self.pool.begin().await?;
        Ok(SqliteUnitOfWork { tx })
    }
}

/// A sale unit of work backed by one `sqlx` transaction.
pub struct SqliteUnitOfWork {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl SaleUnitOfWork for SqliteUnitOfWork {
    async fn lock_products(&mut self, ids: &[String]) -> DbResult<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        debug!(count = ids.len(), "Locking products for sale");

        // No-op write: acquires the database write lock before anything is read.
        let mut lock: QueryBuilder<Sqlite> = QueryBuilder::new(
            "UPDATE products SET stock_quantity = stock_quantity WHERE id IN (",
        );
        push_id_list(&mut lock, ids);
        lock.build().execute(&mut *self.tx).await?;

        let mut select: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id IN ("
        ));
        push_id_list(&mut select, ids);

        let rows: Vec<ProductRow> = select.build_query_as().fetch_all(&mut *self.tx).await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn decrement_stock(
        &mut self,
        product_id: &str,
        quantity: i64,
    ) -> DbResult<StockDecrement> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity - ?2,
                updated_at = ?3
            WHERE id = ?1 AND stock_quantity >= ?2
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(StockDecrement::Applied);
        }

        let available: Option<i64> =
            sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = ?1")
                .bind(product_id)
                .fetch_optional(&mut *self.tx)
                .await?;

        Ok(match available {
            Some(available) => StockDecrement::Insufficient { available },
            None => StockDecrement::Missing,
        })
    }

    async fn insert_sale(&mut self, sale: &Sale) -> DbResult<()> {
        insert_sale_rows(&mut *self.tx, sale).await
    }

    async fn commit(self) -> DbResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> DbResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

fn push_id_list(query: &mut QueryBuilder<'_, Sqlite>, ids: &[String]) {
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(id.clone());
    }
    separated.push_unseparated(")");
}
