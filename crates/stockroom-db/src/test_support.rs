//! Fixtures shared by the repository and coordinator tests.

use chrono::Utc;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

use crate::{Database, DbConfig};
use stockroom_core::{Money, NewSupplier, NewUser, Product, Supplier, User, UserRole};

pub async fn memory_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// File-backed database for tests that need several real connections.
/// The files are removed on drop.
pub struct TempDb {
    pub db: Database,
    path: PathBuf,
}

impl TempDb {
    pub async fn new() -> Self {
        let path = std::env::temp_dir().join(format!("stockroom-test-{}.db", Uuid::new_v4()));
        let db = Database::new(
            DbConfig::new(&path)
                .max_connections(4)
                .busy_timeout(Duration::from_secs(5)),
        )
        .await
        .unwrap();
        TempDb { db, path }
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut file = self.path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}

pub async fn insert_user(db: &Database, username: &str, role: UserRole) -> User {
    db.users()
        .insert(&NewUser {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: format!("hashed:{username}"),
            role,
        })
        .await
        .unwrap()
}

pub async fn insert_supplier(db: &Database, name: &str) -> Supplier {
    db.suppliers()
        .create(&NewSupplier {
            name: name.to_string(),
            contact_name: "Pat Morgan".to_string(),
            phone: Some("555-0100".to_string()),
            email: None,
            address: None,
        })
        .await
        .unwrap()
}

/// Active product named after its sku, reorder threshold 10.
pub async fn insert_product(
    db: &Database,
    supplier_id: &str,
    created_by: &str,
    sku: &str,
    price: Money,
    stock: i64,
) -> Product {
    let now = Utc::now();
    let product = Product {
        id: Uuid::new_v4().to_string(),
        sku: sku.to_string(),
        name: format!("Product {sku}"),
        description: None,
        price,
        stock_quantity: stock,
        min_stock_level: 10,
        supplier_id: supplier_id.to_string(),
        created_by: created_by.to_string(),
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    db.products().insert(&product).await.unwrap()
}
