//! # Product Repository
//!
//! Database operations for products: the catalog half of the Catalog Store.
//!
//! ## Key Operations
//! - Paged listing with keyword / supplier filters
//! - CRUD (sku is immutable)
//! - Conditional stock adjustments that never cross zero
//! - Low-stock report query
//!
//! ## Stock Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  ❌ WRONG: read, compute, write back                                │
//! │     SELECT stock → 10;  UPDATE products SET stock_quantity = 4       │
//! │     (a concurrent writer's change is silently lost)                 │
//! │                                                                     │
//! │  ✅ CORRECT: conditional delta in one statement                     │
//! │     UPDATE products SET stock_quantity = stock_quantity + :delta    │
//! │     WHERE id = :id AND stock_quantity + :delta >= 0                 │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use stockroom_core::report::LowStockEntry;
use stockroom_core::{
    Money, Pagination, Product, ProductFilter, ProductListing, ProductUpdate,
};

// =============================================================================
// Row Mapping
// =============================================================================

pub(crate) const PRODUCT_COLUMNS: &str = "p.id, p.sku, p.name, p.description, p.price_units, \
     p.stock_quantity, p.min_stock_level, p.supplier_id, p.created_by, p.is_active, \
     p.created_at, p.updated_at";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProductRow {
    id: String,
    sku: String,
    name: String,
    description: Option<String>,
    price_units: i64,
    stock_quantity: i64,
    min_stock_level: i64,
    supplier_id: String,
    created_by: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            sku: row.sku,
            name: row.name,
            description: row.description,
            price: Money::from_units(row.price_units),
            stock_quantity: row.stock_quantity,
            min_stock_level: row.min_stock_level,
            supplier_id: row.supplier_id,
            created_by: row.created_by,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductListingRow {
    #[sqlx(flatten)]
    product: ProductRow,
    supplier_name: String,
    created_by_username: String,
}

impl From<ProductListingRow> for ProductListing {
    fn from(row: ProductListingRow) -> Self {
        ProductListing {
            product: row.product.into(),
            supplier_name: row.supplier_name,
            created_by_username: row.created_by_username,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LowStockRow {
    id: String,
    name: String,
    sku: String,
    stock_quantity: i64,
    min_stock_level: i64,
    supplier_name: String,
    supplier_phone: Option<String>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let (page, pagination) = repo.list(&ProductFilter::default()).await?;
/// let product = repo.get_by_id("uuid-here").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists products, sorted by name, one page at a time.
    ///
    /// Inactive products are included unless `is_active` narrows the list.
    ///
    /// ## Filters
    /// - `keyword`: case-insensitive substring of name or sku
    /// - `supplier_id`: exact supplier
    /// - `is_active`: only active or only inactive products
    pub async fn list(&self, filter: &ProductFilter) -> DbResult<(Vec<ProductListing>, Pagination)> {
        let (page, limit) = filter.page_and_limit();
        let offset = i64::from(page - 1) * i64::from(limit);

        debug!(?filter, page, limit, "Listing products");

        let mut count_query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM products p WHERE 1 = 1");
        push_filters(&mut count_query, filter);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {PRODUCT_COLUMNS}, s.name AS supplier_name, u.username AS created_by_username \
             FROM products p \
             JOIN suppliers s ON s.id = p.supplier_id \
             JOIN users u ON u.id = p.created_by \
             WHERE 1 = 1"
        ));
        push_filters(&mut query, filter);
        query
            .push(" ORDER BY p.name, p.sku LIMIT ")
            .push_bind(i64::from(limit))
            .push(" OFFSET ")
            .push_bind(offset);

        let rows: Vec<ProductListingRow> = query.build_query_as().fetch_all(&self.pool).await?;

        debug!(count = rows.len(), total, "Listed products");
        Ok((
            rows.into_iter().map(ProductListing::from).collect(),
            Pagination::new(total, page, limit),
        ))
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Gets a product by its SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.sku = ?1"
        ))
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - The inserted product
    /// * `Err(DbError::UniqueViolation)` - SKU already exists
    /// * `Err(DbError::ForeignKeyViolation)` - Supplier or creator missing
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, description, price_units,
                stock_quantity, min_stock_level, supplier_id, created_by,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.units())
        .bind(product.stock_quantity)
        .bind(product.min_stock_level)
        .bind(&product.supplier_id)
        .bind(&product.created_by)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_duplicate_value(&product.sku))?;

        Ok(product.clone())
    }

    /// Applies a partial update. Absent fields keep their stored value.
    pub async fn update(&self, id: &str, changes: &ProductUpdate) -> DbResult<Product> {
        debug!(id = %id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = COALESCE(?2, name),
                description = COALESCE(?3, description),
                price_units = COALESCE(?4, price_units),
                min_stock_level = COALESCE(?5, min_stock_level),
                supplier_id = COALESCE(?6, supplier_id),
                is_active = COALESCE(?7, is_active),
                updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(changes.price.map(|p| p.units()))
        .bind(changes.min_stock_level)
        .bind(&changes.supplier_id)
        .bind(changes.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Adds `delta` to the stock level (negative to remove stock).
    ///
    /// The write is conditional. Nothing changes when the result would be
    /// below zero (`DbError::NegativeStock`) or above `i64::MAX`
    /// (`DbError::StockOutOfRange`). SQLite silently turns an overflowing
    /// integer sum into a REAL, so the upper bound is checked by subtraction.
    pub async fn adjust_stock(&self, id: &str, delta: i64) -> DbResult<Product> {
        debug!(id = %id, delta = %delta, "Adjusting stock");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity + ?2,
                updated_at = ?3
            WHERE id = ?1
              AND stock_quantity + ?2 >= 0
              AND (?2 <= 0 OR stock_quantity <= 9223372036854775807 - ?2)
            "#,
        )
        .bind(id)
        .bind(delta)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get_by_id(id).await? {
                Some(product) if product.stock_quantity.checked_add(delta).is_none() => {
                    Err(DbError::StockOutOfRange {
                        product_id: id.to_string(),
                        available: product.stock_quantity,
                        delta,
                    })
                }
                Some(product) => Err(DbError::NegativeStock {
                    product_id: id.to_string(),
                    available: product.stock_quantity,
                    delta,
                }),
                None => Err(DbError::not_found("Product", id)),
            };
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Soft-deletes a product by setting is_active = false.
    ///
    /// Recorded sales keep referencing it; it just stops being sellable.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deactivating product");

        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Permanently removes a product.
    ///
    /// Fails with `ForeignKeyViolation` once any sale references it.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts products that reference a supplier (active or not).
    pub async fn count_by_supplier(&self, supplier_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE supplier_id = ?1")
            .bind(supplier_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Counts all products (for diagnostics and seeding).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Products below their reorder threshold, lowest stock first.
    pub async fn low_stock(&self) -> DbResult<Vec<LowStockEntry>> {
        let rows: Vec<LowStockRow> = sqlx::query_as(
            r#"
            SELECT
                p.id, p.name, p.sku, p.stock_quantity, p.min_stock_level,
                s.name AS supplier_name, s.phone AS supplier_phone
            FROM products p
            JOIN suppliers s ON s.id = p.supplier_id
            WHERE p.stock_quantity < p.min_stock_level
            ORDER BY p.stock_quantity ASC, p.name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rows.len(), "Low stock products");

        Ok(rows
            .into_iter()
            .map(|row| LowStockEntry {
                product_id: row.id,
                name: row.name,
                sku: row.sku,
                stock_quantity: row.stock_quantity,
                min_stock_level: row.min_stock_level,
                supplier_name: row.supplier_name,
                supplier_phone: row.supplier_phone,
            })
            .collect())
    }
}

/// Appends the filter's WHERE clauses. Expects a preceding `WHERE`.
fn push_filters(query: &mut QueryBuilder<'_, Sqlite>, filter: &ProductFilter) {
    if let Some(keyword) = filter.keyword() {
        let pattern = format!("%{}%", escape_like(keyword));
        query
            .push(" AND (p.name LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR p.sku LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }

    if let Some(supplier_id) = filter.supplier_id.as_deref().filter(|s| !s.is_empty()) {
        query
            .push(" AND p.supplier_id = ")
            .push_bind(supplier_id.to_string());
    }

    if let Some(active) = filter.is_active {
        query.push(" AND p.is_active = ").push_bind(active);
    }
}

/// Escapes LIKE wildcards so the keyword matches literally.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Generates a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{insert_product, insert_supplier, insert_user, memory_db};
    use stockroom_core::UserRole;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = memory_db().await;
        let user = insert_user(&db, "inv", UserRole::Inventory).await;
        let supplier = insert_supplier(&db, "Acme").await;
        let product = insert_product(&db, &supplier.id, &user.id, "BEAN-001", Money::from_cents(1250), 8).await;

        let fetched = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(fetched, product);

        let by_sku = db.products().get_by_sku("BEAN-001").await.unwrap().unwrap();
        assert_eq!(by_sku.id, product.id);
    }

    #[tokio::test]
    async fn test_duplicate_sku_rejected() {
        let db = memory_db().await;
        let user = insert_user(&db, "inv", UserRole::Inventory).await;
        let supplier = insert_supplier(&db, "Acme").await;
        let original = insert_product(&db, &supplier.id, &user.id, "BEAN-001", Money::from_cents(100), 1).await;

        let mut dup = original.clone();
        dup.id = generate_product_id();
        let err = db.products().insert(&dup).await.unwrap_err();
        match err {
            DbError::UniqueViolation { field, value } => {
                assert_eq!(field, "sku");
                assert_eq!(value, "BEAN-001");
            }
            other => panic!("expected UniqueViolation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_list_filters_and_paginates() {
        let db = memory_db().await;
        let user = insert_user(&db, "inv", UserRole::Inventory).await;
        let acme = insert_supplier(&db, "Acme").await;
        let globex = insert_supplier(&db, "Globex").await;

        insert_product(&db, &acme.id, &user.id, "BEAN-001", Money::from_cents(100), 1).await;
        insert_product(&db, &acme.id, &user.id, "BEAN-002", Money::from_cents(100), 1).await;
        insert_product(&db, &globex.id, &user.id, "TEA-001", Money::from_cents(100), 1).await;

        let (all, pagination) = db
            .products()
            .list(&ProductFilter {
                limit: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(pagination.total_products, 3);
        assert_eq!(pagination.total_pages, 2);
        assert!(pagination.has_next_page);

        let (beans, _) = db
            .products()
            .list(&ProductFilter {
                keyword: Some("bean".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(beans.len(), 2);
        assert!(beans.iter().all(|p| p.supplier_name == "Acme"));
        assert!(beans.iter().all(|p| p.created_by_username == "inv"));

        let (globex_only, _) = db
            .products()
            .list(&ProductFilter {
                supplier_id: Some(globex.id.clone()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(globex_only.len(), 1);
        assert_eq!(globex_only[0].product.sku, "TEA-001");
    }

    #[tokio::test]
    async fn test_update_keeps_unspecified_fields() {
        let db = memory_db().await;
        let user = insert_user(&db, "inv", UserRole::Inventory).await;
        let supplier = insert_supplier(&db, "Acme").await;
        let product = insert_product(&db, &supplier.id, &user.id, "BEAN-001", Money::from_cents(100), 5).await;

        let updated = db
            .products()
            .update(
                &product.id,
                &ProductUpdate {
                    price: Some(Money::from_cents(175)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.price, Money::from_cents(175));
        assert_eq!(updated.name, product.name);
        assert_eq!(updated.stock_quantity, 5);

        let missing = db
            .products()
            .update(&generate_product_id(), &ProductUpdate::default())
            .await;
        assert!(matches!(missing, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_adjust_stock_never_negative() {
        let db = memory_db().await;
        let user = insert_user(&db, "inv", UserRole::Inventory).await;
        let supplier = insert_supplier(&db, "Acme").await;
        let product = insert_product(&db, &supplier.id, &user.id, "BEAN-001", Money::from_cents(100), 5).await;

        let restocked = db.products().adjust_stock(&product.id, 7).await.unwrap();
        assert_eq!(restocked.stock_quantity, 12);

        let err = db.products().adjust_stock(&product.id, -13).await.unwrap_err();
        assert!(matches!(err, DbError::NegativeStock { available: 12, .. }));

        let drained = db.products().adjust_stock(&product.id, -12).await.unwrap();
        assert_eq!(drained.stock_quantity, 0);
    }

    #[tokio::test]
    async fn test_adjust_stock_rejects_overflow() {
        let db = memory_db().await;
        let user = insert_user(&db, "inv", UserRole::Inventory).await;
        let supplier = insert_supplier(&db, "Acme").await;
        let product = insert_product(&db, &supplier.id, &user.id, "BEAN-001", Money::from_cents(100), 5).await;

        let err = db.products().adjust_stock(&product.id, i64::MAX).await.unwrap_err();
        assert!(matches!(err, DbError::StockOutOfRange { available: 5, .. }));

        // Row untouched and still an integer
        let kind: String = sqlx::query_scalar("SELECT typeof(stock_quantity) FROM products WHERE id = ?1")
            .bind(&product.id)
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(kind, "integer");
        let (listed, _) = db.products().list(&ProductFilter::default()).await.unwrap();
        assert_eq!(listed[0].product.stock_quantity, 5);

        let topped = db.products().adjust_stock(&product.id, i64::MAX - 5).await.unwrap();
        assert_eq!(topped.stock_quantity, i64::MAX);
        let err = db.products().adjust_stock(&product.id, 1).await.unwrap_err();
        assert!(matches!(err, DbError::StockOutOfRange { .. }));
    }

    #[tokio::test]
    async fn test_stock_column_only_holds_integers() {
        let db = memory_db().await;
        let user = insert_user(&db, "inv", UserRole::Inventory).await;
        let supplier = insert_supplier(&db, "Acme").await;
        let product = insert_product(&db, &supplier.id, &user.id, "BEAN-001", Money::from_cents(100), 5).await;

        let err = sqlx::query("UPDATE products SET stock_quantity = 2.5 WHERE id = ?1")
            .bind(&product.id)
            .execute(db.pool())
            .await
            .map_err(DbError::from)
            .unwrap_err();
        assert!(matches!(err, DbError::ConstraintViolation(_)));
    }

    #[tokio::test]
    async fn test_deactivated_product_stays_listed() {
        let db = memory_db().await;
        let user = insert_user(&db, "inv", UserRole::Inventory).await;
        let supplier = insert_supplier(&db, "Acme").await;
        let product = insert_product(&db, &supplier.id, &user.id, "BEAN-001", Money::from_cents(100), 5).await;
        insert_product(&db, &supplier.id, &user.id, "BEAN-002", Money::from_cents(100), 5).await;

        db.products().deactivate(&product.id).await.unwrap();

        let (listed, pagination) = db.products().list(&ProductFilter::default()).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(pagination.total_products, 2);

        let (inactive, pagination) = db
            .products()
            .list(&ProductFilter {
                is_active: Some(false),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(pagination.total_products, 1);
        assert_eq!(inactive[0].product.id, product.id);
        assert!(!inactive[0].product.is_active);

        let (active, _) = db
            .products()
            .list(&ProductFilter {
                is_active: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].product.sku, "BEAN-002");
    }

    #[tokio::test]
    async fn test_low_stock_sorted_ascending() {
        let db = memory_db().await;
        let user = insert_user(&db, "inv", UserRole::Inventory).await;
        let supplier = insert_supplier(&db, "Acme").await;

        insert_product(&db, &supplier.id, &user.id, "A-1", Money::from_cents(100), 7).await;
        insert_product(&db, &supplier.id, &user.id, "A-2", Money::from_cents(100), 2).await;
        insert_product(&db, &supplier.id, &user.id, "A-3", Money::from_cents(100), 50).await;
        // min_stock_level is 10 for every fixture product

        let low = db.products().low_stock().await.unwrap();
        let skus: Vec<_> = low.iter().map(|e| e.sku.as_str()).collect();
        assert_eq!(skus, vec!["A-2", "A-1"]);
        assert_eq!(low[0].supplier_name, "Acme");
        assert_eq!(low[0].supplier_phone.as_deref(), Some("555-0100"));
    }
}
