//! # Sale Repository
//!
//! Read side of the sale ledger plus the row writer the unit of work uses.
//!
//! ## Immutability
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Sales are append-only.                                             │
//! │                                                                     │
//! │  • This module exposes no update or delete                          │
//! │  • Triggers in the schema abort any UPDATE / DELETE on              │
//! │    sales and sale_items                                             │
//! │  • Prices are stored per line (price_at_sale_units), so later       │
//! │    catalog price changes never alter a recorded sale                │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::debug;

use crate::error::{DbError, DbResult};
use stockroom_core::report::{SalesPeriod, SalesSummaryRow};
use stockroom_core::{Money, Sale, SaleItem, SaleListing, SaleListingItem};

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct SaleRow {
    id: String,
    sale_date: DateTime<Utc>,
    customer_name: String,
    total_amount_units: i64,
    processed_by: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct SaleItemRow {
    product_id: String,
    quantity: i64,
    price_at_sale_units: i64,
}

impl From<SaleItemRow> for SaleItem {
    fn from(row: SaleItemRow) -> Self {
        SaleItem {
            product_id: row.product_id,
            quantity: row.quantity,
            price_at_sale: Money::from_units(row.price_at_sale_units),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SaleListingRow {
    id: String,
    sale_date: DateTime<Utc>,
    customer_name: String,
    total_amount_units: i64,
    processed_by: String,
    processed_by_username: String,
}

#[derive(Debug, sqlx::FromRow)]
struct SaleListingItemRow {
    sale_id: String,
    product_id: String,
    product_name: String,
    product_sku: String,
    quantity: i64,
    price_at_sale_units: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct SummaryRow {
    product_id: String,
    product_name: String,
    sku: String,
    total_quantity_sold: i64,
    revenue_units: i64,
    count_sales: i64,
}

// =============================================================================
// Writes (unit of work only)
// =============================================================================

/// Writes a sale header and its lines on the given connection.
///
/// Only called from inside a sale unit of work, so header and lines share
/// the caller's transaction.
pub(crate) async fn insert_sale_rows(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sales (id, sale_date, customer_name, total_amount_units, processed_by, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&sale.id)
    .bind(sale.sale_date)
    .bind(&sale.customer_name)
    .bind(sale.total_amount.units())
    .bind(&sale.processed_by)
    .bind(sale.created_at)
    .execute(&mut *conn)
    .await?;

    for (line_no, item) in sale.items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO sale_items (sale_id, line_no, product_id, quantity, price_at_sale_units)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&sale.id)
        .bind(line_no as i64)
        .bind(&item.product_id)
        .bind(item.quantity)
        .bind(item.price_at_sale.units())
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale with its lines in recorded order.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let row: Option<SaleRow> = sqlx::query_as(
            r#"
            SELECT id, sale_date, customer_name, total_amount_units, processed_by, created_at
            FROM sales WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items: Vec<SaleItemRow> = sqlx::query_as(
            r#"
            SELECT product_id, quantity, price_at_sale_units
            FROM sale_items WHERE sale_id = ?1
            ORDER BY line_no
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        if items.is_empty() {
            return Err(DbError::corrupt("sales", format!("sale {id} has no items")));
        }

        Ok(Some(Sale {
            id: row.id,
            sale_date: row.sale_date,
            customer_name: row.customer_name,
            items: items.into_iter().map(SaleItem::from).collect(),
            total_amount: Money::from_units(row.total_amount_units),
            processed_by: row.processed_by,
            created_at: row.created_at,
        }))
    }

    /// Most recent sales first, with cashier username and product details.
    pub async fn list_recent(&self, page: u32, limit: u32) -> DbResult<Vec<SaleListing>> {
        let page = page.max(1);
        let offset = i64::from(page - 1) * i64::from(limit);

        debug!(page, limit, "Listing recent sales");

        let headers: Vec<SaleListingRow> = sqlx::query_as(
            r#"
            SELECT s.id, s.sale_date, s.customer_name, s.total_amount_units,
                   s.processed_by, u.username AS processed_by_username
            FROM sales s
            JOIN users u ON u.id = s.processed_by
            ORDER BY s.sale_date DESC, s.id
            LIMIT ?1 OFFSET ?2
            "#,
        )
        .bind(i64::from(limit))
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        if headers.is_empty() {
            return Ok(Vec::new());
        }

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT si.sale_id, si.product_id, p.name AS product_name, p.sku AS product_sku, \
             si.quantity, si.price_at_sale_units \
             FROM sale_items si \
             JOIN products p ON p.id = si.product_id \
             WHERE si.sale_id IN (",
        );
        let mut ids = query.separated(", ");
        for header in &headers {
            ids.push_bind(header.id.clone());
        }
        query.push(") ORDER BY si.sale_id, si.line_no");

        let item_rows: Vec<SaleListingItemRow> =
            query.build_query_as().fetch_all(&self.pool).await?;

        let mut items_by_sale: HashMap<String, Vec<SaleListingItem>> = HashMap::new();
        for row in item_rows {
            items_by_sale
                .entry(row.sale_id)
                .or_default()
                .push(SaleListingItem {
                    product_id: row.product_id,
                    product_name: row.product_name,
                    product_sku: row.product_sku,
                    quantity: row.quantity,
                    price_at_sale: Money::from_units(row.price_at_sale_units),
                });
        }

        Ok(headers
            .into_iter()
            .map(|header| SaleListing {
                items: items_by_sale.remove(&header.id).unwrap_or_default(),
                id: header.id,
                sale_date: header.sale_date,
                customer_name: header.customer_name,
                total_amount: Money::from_units(header.total_amount_units),
                processed_by: header.processed_by,
                processed_by_username: header.processed_by_username,
            })
            .collect())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Per-product totals for sales dated inside `period`, highest revenue
    /// first. Revenue is summed exactly and rounded once per product.
    pub async fn sales_summary(&self, period: &SalesPeriod) -> DbResult<Vec<SalesSummaryRow>> {
        debug!(start = %period.start, end = %period.end, "Summarising sales");

        let rows: Vec<SummaryRow> = sqlx::query_as(
            r#"
            SELECT
                si.product_id,
                p.name AS product_name,
                p.sku,
                SUM(si.quantity) AS total_quantity_sold,
                SUM(si.quantity * si.price_at_sale_units) AS revenue_units,
                COUNT(*) AS count_sales
            FROM sale_items si
            JOIN sales s ON s.id = si.sale_id
            JOIN products p ON p.id = si.product_id
            WHERE s.sale_date >= ?1 AND s.sale_date <= ?2
            GROUP BY si.product_id, p.name, p.sku
            ORDER BY revenue_units DESC, p.name ASC
            "#,
        )
        .bind(period.start)
        .bind(period.end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| SalesSummaryRow {
                product_id: row.product_id,
                product_name: row.product_name,
                sku: row.sku,
                total_quantity_sold: row.total_quantity_sold,
                total_revenue: Money::from_units(row.revenue_units).round_to_cents(),
                count_sales: row.count_sales,
            })
            .collect())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
