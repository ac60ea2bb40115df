//! # Seed Data Generator
//!
//! Populates the database with demo accounts and stock for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./stockroom.db (or $DATABASE_PATH)
//! cargo run -p stockroom-api --bin seed
//!
//! # Specify database path
//! cargo run -p stockroom-api --bin seed -- --db ./data/stockroom.db
//! ```
//!
//! ## Generated Records
//! - Users `admin`, `inventory` and `sales`, one per role
//! - Three suppliers
//! - Products per supplier, some already below their minimum stock level
//!   so the low-stock report has something to show

use chrono::Utc;
use std::env;

use stockroom_api::Argon2PasswordHasher;
use stockroom_core::{Money, NewProduct, NewSupplier, NewUser, NewUserInput, UserRole};
use stockroom_db::repository::product::generate_product_id;
use stockroom_db::{Database, DbConfig};
use uuid::Uuid;

/// Demo accounts: (username, password, role)
const USERS: &[(&str, &str, UserRole)] = &[
    ("admin", "admin123", UserRole::Admin),
    ("inventory", "inventory123", UserRole::Inventory),
    ("sales", "sales123", UserRole::Sales),
];

/// Suppliers: (name, contact, phone, email)
const SUPPLIERS: &[(&str, &str, &str, &str)] = &[
    ("Northwind Traders", "Laura Callahan", "555-0142", "orders@northwind.example"),
    ("Blue Ridge Coffee", "Sam Okafor", "555-0187", "sales@blueridge.example"),
    ("Harbor Paper Goods", "Ines Duarte", "555-0163", "hello@harborpaper.example"),
];

/// Products: (supplier index, sku, name, price in cents, stock, minimum)
const PRODUCTS: &[(usize, &str, &str, i64, i64, i64)] = &[
    (0, "NW-TEA-001", "Earl Grey Tea 100ct", 899, 48, 10),
    (0, "NW-TEA-002", "Green Tea 50ct", 649, 6, 10),
    (0, "NW-SUG-001", "Cane Sugar 1kg", 349, 120, 20),
    (1, "BR-BEAN-001", "House Blend Beans 1lb", 1299, 35, 15),
    (1, "BR-BEAN-002", "Dark Roast Beans 1lb", 1399, 4, 15),
    (1, "BR-FLT-001", "Paper Filters #4", 499, 0, 25),
    (2, "HP-CUP-012", "Paper Cups 12oz (50)", 799, 200, 50),
    (2, "HP-NAP-001", "Napkins (500)", 999, 12, 30),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = env::var("DATABASE_PATH").unwrap_or_else(|_| String::from("./stockroom.db"));

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Stockroom Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./stockroom.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Stockroom Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.users().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} users", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Users
    let hasher = Argon2PasswordHasher;
    let mut admin_id = None;
    for (username, password, role) in USERS {
        let input = NewUserInput {
            username: username.to_string(),
            email: format!("{username}@stockroom.example"),
            password: password.to_string(),
            role: Some(*role),
        };
        let user = db
            .users()
            .insert(&NewUser::create(Uuid::new_v4().to_string(), input, &hasher)?)
            .await?;
        if user.role == UserRole::Admin {
            admin_id = Some(user.id.clone());
        }
        println!("  + user {:<10} ({}) password: {}", user.username, user.role, password);
    }
    let admin_id = admin_id.ok_or("seed defines no admin user")?;

    // Suppliers
    let mut supplier_ids = Vec::with_capacity(SUPPLIERS.len());
    for (name, contact, phone, email) in SUPPLIERS {
        let input = NewSupplier {
            name: name.to_string(),
            contact_name: contact.to_string(),
            phone: Some(phone.to_string()),
            email: Some(email.to_string()),
            address: None,
        };
        let supplier = db.suppliers().create(&input.normalized()?).await?;
        println!("  + supplier {}", supplier.name);
        supplier_ids.push(supplier.id);
    }

    // Products
    let now = Utc::now();
    let mut low = 0;
    for (supplier_idx, sku, name, price_cents, stock, minimum) in PRODUCTS {
        let input = NewProduct {
            sku: sku.to_string(),
            name: name.to_string(),
            description: None,
            price: Money::from_cents(*price_cents),
            stock_quantity: Some(*stock),
            min_stock_level: Some(*minimum),
            supplier_id: supplier_ids[*supplier_idx].clone(),
        };
        let product = db
            .products()
            .insert(&input.into_product(generate_product_id(), &admin_id, now)?)
            .await?;
        if product.is_low_stock() {
            low += 1;
        }
    }
    println!("  + {} products ({} below minimum stock)", PRODUCTS.len(), low);

    db.close().await;

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
