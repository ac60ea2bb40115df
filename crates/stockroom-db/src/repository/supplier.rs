//! # Supplier Repository
//!
//! Database operations for suppliers. Deletion is refused while any product
//! still references the supplier.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use stockroom_core::{NewSupplier, Supplier, SupplierUpdate};

#[derive(Debug, sqlx::FromRow)]
struct SupplierRow {
    id: String,
    name: String,
    contact_name: String,
    phone: Option<String>,
    email: Option<String>,
    address: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SupplierRow> for Supplier {
    fn from(row: SupplierRow) -> Self {
        Supplier {
            id: row.id,
            name: row.name,
            contact_name: row.contact_name,
            phone: row.phone,
            email: row.email,
            address: row.address,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SUPPLIER_COLUMNS: &str =
    "id, name, contact_name, phone, email, address, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    /// Creates a supplier from validated input.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - Name already taken
    pub async fn create(&self, input: &NewSupplier) -> DbResult<Supplier> {
        debug!(name = %input.name, "Creating supplier");

        let now = Utc::now();
        let supplier = Supplier {
            id: Uuid::new_v4().to_string(),
            name: input.name.clone(),
            contact_name: input.contact_name.clone(),
            phone: input.phone.clone(),
            email: input.email.clone(),
            address: input.address.clone(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO suppliers (id, name, contact_name, phone, email, address, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&supplier.id)
        .bind(&supplier.name)
        .bind(&supplier.contact_name)
        .bind(&supplier.phone)
        .bind(&supplier.email)
        .bind(&supplier.address)
        .bind(supplier.created_at)
        .bind(supplier.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_duplicate_value(&supplier.name))?;

        Ok(supplier)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Supplier>> {
        let row: Option<SupplierRow> =
            sqlx::query_as(&format!("SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(Supplier::from))
    }

    /// All suppliers, sorted by name.
    pub async fn list(&self) -> DbResult<Vec<Supplier>> {
        let rows: Vec<SupplierRow> =
            sqlx::query_as(&format!("SELECT {SUPPLIER_COLUMNS} FROM suppliers ORDER BY name"))
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(Supplier::from).collect())
    }

    /// Applies a partial update. Absent fields keep their stored value.
    pub async fn update(&self, id: &str, changes: &SupplierUpdate) -> DbResult<Supplier> {
        debug!(id = %id, "Updating supplier");

        let result = sqlx::query(
            r#"
            UPDATE suppliers SET
                name = COALESCE(?2, name),
                contact_name = COALESCE(?3, contact_name),
                phone = COALESCE(?4, phone),
                email = COALESCE(?5, email),
                address = COALESCE(?6, address),
                updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.contact_name)
        .bind(&changes.phone)
        .bind(&changes.email)
        .bind(&changes.address)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let err = DbError::from(e);
            match &changes.name {
                Some(name) => err.with_duplicate_value(name),
                None => err,
            }
        })?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Supplier", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Supplier", id))
    }

    /// Deletes a supplier that no product references.
    ///
    /// The reference count and the delete run in one transaction so a
    /// product inserted in between cannot be orphaned.
    ///
    /// ## Returns
    /// * `Err(DbError::StillReferenced)` - Products still point at it
    /// * `Err(DbError::NotFound)` - No such supplier
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting supplier");

        let mut tx = self.pool.begin().await?;

        let referencing: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE supplier_id = ?1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;

        if referencing > 0 {
            return Err(DbError::StillReferenced {
                entity: "Supplier".to_string(),
                id: id.to_string(),
                referenced_by: "products".to_string(),
                count: referencing,
            });
        }

        let result = sqlx::query("DELETE FROM suppliers WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Supplier", id));
        }

        tx.commit().await?;
        Ok(())
    }
}
