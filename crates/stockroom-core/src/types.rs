//! # Domain Types
//!
//! Core domain types used throughout Stockroom.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐        │
//! │  │    Supplier     │◄──│    Product      │◄──│    SaleItem     │        │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │        │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  product_id     │        │
//! │  │  name (unique)  │   │  sku (unique)   │   │  quantity       │        │
//! │  │  contact_name   │   │  price          │   │  price_at_sale  │        │
//! │  └─────────────────┘   │  stock_quantity │   └────────┬────────┘        │
//! │                        │  supplier_id    │            │ owned by        │
//! │  ┌─────────────────┐   │  created_by ────┼──┐  ┌─────▼───────────┐     │
//! │  │      User       │◄──┴─────────────────┘  └──│      Sale       │     │
//! │  │  ─────────────  │                           │  ─────────────  │     │
//! │  │  username       │◄──────── processed_by ────│  total_amount   │     │
//! │  │  role           │                           │  (immutable)    │     │
//! │  └─────────────────┘                           └─────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Read Models vs Records
//! `User` carries the password hash and is never serialized. Everything that
//! crosses the API boundary is a `UserProfile`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::password::PasswordHasher;
use crate::validation::{
    validate_contact_name, validate_email, validate_password, validate_price,
    validate_product_name, validate_sku, validate_stock_level, validate_supplier_name,
    validate_username, validate_uuid_field, ValidationResult,
};
use crate::DEFAULT_MIN_STOCK_LEVEL;

// =============================================================================
// User Role
// =============================================================================

/// The closed set of roles a user can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum UserRole {
    Admin,
    /// Default role for new accounts.
    #[default]
    Inventory,
    Sales,
}

impl UserRole {
    pub const ALL: [UserRole; 3] = [UserRole::Admin, UserRole::Inventory, UserRole::Sales];

    pub const fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "Admin",
            UserRole::Inventory => "Inventory",
            UserRole::Sales => "Sales",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UserRole::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: UserRole::ALL.iter().map(|r| r.as_str().to_string()).collect(),
            })
    }
}

// =============================================================================
// Supplier
// =============================================================================

/// A vendor that products are sourced from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Supplier {
    pub id: String,
    /// Unique across suppliers.
    pub name: String,
    pub contact_name: String,
    pub phone: Option<String>,
    /// Stored lowercase.
    pub email: Option<String>,
    pub address: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a supplier.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSupplier {
    pub name: String,
    pub contact_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl NewSupplier {
    /// Validates and normalizes the input (trimmed names, lowercase email).
    pub fn normalized(self) -> ValidationResult<NewSupplier> {
        validate_supplier_name(&self.name)?;
        validate_contact_name(&self.contact_name)?;
        let email = normalize_optional_email(self.email)?;

        Ok(NewSupplier {
            name: self.name.trim().to_string(),
            contact_name: self.contact_name.trim().to_string(),
            phone: trim_optional(self.phone),
            email,
            address: trim_optional(self.address),
        })
    }
}

/// Partial update for a supplier. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierUpdate {
    pub name: Option<String>,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

impl SupplierUpdate {
    pub fn normalized(self) -> ValidationResult<SupplierUpdate> {
        if let Some(name) = &self.name {
            validate_supplier_name(name)?;
        }
        if let Some(contact) = &self.contact_name {
            validate_contact_name(contact)?;
        }
        let email = normalize_optional_email(self.email)?;

        Ok(SupplierUpdate {
            name: self.name.map(|n| n.trim().to_string()),
            contact_name: self.contact_name.map(|c| c.trim().to_string()),
            phone: trim_optional(self.phone),
            email,
            address: trim_optional(self.address),
        })
    }
}

// =============================================================================
// Product
// =============================================================================

/// A stocked item.
///
/// `stock_quantity` is never negative. The only code paths that lower it are
/// conditional decrements that refuse to cross zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    pub id: String,
    /// Business identifier. Immutable after creation.
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    #[ts(type = "number")]
    pub price: Money,
    pub stock_quantity: i64,
    pub min_stock_level: i64,
    pub supplier_id: String,
    /// User who created the product. Set once.
    pub created_by: String,
    /// Inactive products are hidden from sales but kept for history.
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether the product has fallen below its reorder threshold.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity < self.min_stock_level
    }

    #[inline]
    pub fn can_fulfil(&self, quantity: i64) -> bool {
        self.stock_quantity >= quantity
    }
}

/// A product joined with the names of the records it references.
#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductListing {
    #[serde(flatten)]
    pub product: Product,
    pub supplier_name: String,
    pub created_by_username: String,
}

/// Input for creating a product.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Money,
    /// Defaults to 0.
    #[serde(default)]
    pub stock_quantity: Option<i64>,
    /// Defaults to [`DEFAULT_MIN_STOCK_LEVEL`].
    #[serde(default)]
    pub min_stock_level: Option<i64>,
    pub supplier_id: String,
}

impl NewProduct {
    /// Validates the input and builds the product record.
    ///
    /// ## Arguments
    /// * `id` - Fresh product UUID
    /// * `created_by` - Acting user, recorded once
    /// * `now` - Creation timestamp
    pub fn into_product(
        self,
        id: String,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> ValidationResult<Product> {
        validate_sku(&self.sku)?;
        validate_product_name(&self.name)?;
        validate_price(self.price)?;
        validate_uuid_field("supplierId", &self.supplier_id)?;

        let stock_quantity = self.stock_quantity.unwrap_or(0);
        validate_stock_level("stockQuantity", stock_quantity)?;
        let min_stock_level = self.min_stock_level.unwrap_or(DEFAULT_MIN_STOCK_LEVEL);
        validate_stock_level("minStockLevel", min_stock_level)?;

        Ok(Product {
            id,
            sku: self.sku.trim().to_string(),
            name: self.name.trim().to_string(),
            description: trim_optional(self.description),
            price: self.price,
            stock_quantity,
            min_stock_level,
            supplier_id: self.supplier_id,
            created_by: created_by.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update for a product.
///
/// There is no `sku` field: the business key is fixed at creation. Stock is
/// changed only through stock adjustments and sales.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub min_stock_level: Option<i64>,
    pub supplier_id: Option<String>,
    pub is_active: Option<bool>,
}

impl ProductUpdate {
    pub fn normalized(self) -> ValidationResult<ProductUpdate> {
        if let Some(name) = &self.name {
            validate_product_name(name)?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        if let Some(level) = self.min_stock_level {
            validate_stock_level("minStockLevel", level)?;
        }
        if let Some(supplier_id) = &self.supplier_id {
            validate_uuid_field("supplierId", supplier_id)?;
        }

        Ok(ProductUpdate {
            name: self.name.map(|n| n.trim().to_string()),
            description: trim_optional(self.description),
            ..self
        })
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.min_stock_level.is_none()
            && self.supplier_id.is_none()
            && self.is_active.is_none()
    }
}

// =============================================================================
// Listing / Pagination
// =============================================================================

/// Default page size for product listings.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Upper bound on page size.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Filter for product listings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    /// Case-insensitive substring match on name or sku.
    pub keyword: Option<String>,
    #[serde(alias = "supplier")]
    pub supplier_id: Option<String>,
    /// Unset lists active and inactive products together.
    pub is_active: Option<bool>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ProductFilter {
    /// Returns `(page, limit)` with defaults applied and limit clamped.
    pub fn page_and_limit(&self) -> (u32, u32) {
        page_and_limit(self.page, self.limit)
    }

    /// Trimmed keyword, `None` when empty.
    pub fn keyword(&self) -> Option<&str> {
        self.keyword
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

/// Applies page defaults: page starts at 1, limit in `1..=MAX_PAGE_SIZE`.
pub fn page_and_limit(page: Option<u32>, limit: Option<u32>) -> (u32, u32) {
    let page = page.filter(|p| *p > 0).unwrap_or(1);
    let limit = limit
        .filter(|l| *l > 0)
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .min(MAX_PAGE_SIZE);
    (page, limit)
}

/// Pagination block returned with paged listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Pagination {
    pub total_products: i64,
    pub current_page: u32,
    pub total_pages: i64,
    pub has_next_page: bool,
}

impl Pagination {
    pub fn new(total: i64, page: u32, limit: u32) -> Self {
        let limit = i64::from(limit.max(1));
        let total_pages = (total + limit - 1) / limit;
        Pagination {
            total_products: total,
            current_page: page,
            total_pages,
            has_next_page: i64::from(page) < total_pages,
        }
    }
}

// =============================================================================
// User
// =============================================================================

/// Persisted user record including the credential hash.
///
/// Deliberately not `Serialize`; convert with [`User::profile`].
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// User read model. Never carries the hash.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Plaintext input for creating a user.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUserInput {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<UserRole>,
}

/// A validated user ready to insert. The hash is computed here, once.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
}

impl NewUser {
    /// Validates the input and hashes the password.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let user = NewUser::create(id, input, &hasher)?;
    /// db.users().insert(&user).await?;
    /// ```
    pub fn create(
        id: String,
        input: NewUserInput,
        hasher: &dyn PasswordHasher,
    ) -> CoreResult<NewUser> {
        validate_username(&input.username)?;
        validate_email(&input.email)?;
        validate_password(&input.password)?;

        let password_hash = hasher.hash(&input.password)?;

        Ok(NewUser {
            id,
            username: input.username.trim().to_string(),
            email: input.email.trim().to_lowercase(),
            password_hash,
            role: input.role.unwrap_or_default(),
        })
    }
}

/// Plaintext partial update for a user.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdateInput {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<UserRole>,
}

/// Validated user changes. `password_hash` is set only when a new password
/// was supplied.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<UserRole>,
}

impl UserChanges {
    pub fn from_input(input: UserUpdateInput, hasher: &dyn PasswordHasher) -> CoreResult<Self> {
        if let Some(username) = &input.username {
            validate_username(username)?;
        }
        if let Some(email) = &input.email {
            validate_email(email)?;
        }

        let password_hash = match input.password.as_deref() {
            Some(password) => {
                validate_password(password)?;
                Some(hasher.hash(password)?)
            }
            None => None,
        };

        Ok(UserChanges {
            username: input.username.map(|u| u.trim().to_string()),
            email: input.email.map(|e| e.trim().to_lowercase()),
            password_hash,
            role: input.role,
        })
    }
}

// =============================================================================
// Sale
// =============================================================================

/// One line of a recorded sale. Duplicate products stay separate lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleItem {
    pub product_id: String,
    pub quantity: i64,
    /// Unit price locked when the sale was recorded.
    #[ts(type = "number")]
    pub price_at_sale: Money,
}

impl SaleItem {
    /// Exact line contribution (`quantity × price_at_sale`).
    pub fn line_amount(&self) -> Option<Money> {
        self.price_at_sale.checked_mul_quantity(self.quantity)
    }
}

/// A committed sale. Immutable: there is no update or delete path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Sale {
    pub id: String,
    #[ts(as = "String")]
    pub sale_date: DateTime<Utc>,
    pub customer_name: String,
    pub items: Vec<SaleItem>,
    /// `round2(Σ quantity × price_at_sale)`.
    #[ts(type = "number")]
    pub total_amount: Money,
    /// User who recorded the sale.
    pub processed_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Sale line with product names resolved for display.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleListingItem {
    pub product_id: String,
    pub product_name: String,
    pub product_sku: String,
    pub quantity: i64,
    #[ts(type = "number")]
    pub price_at_sale: Money,
}

/// Sale with referenced names resolved for display.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleListing {
    pub id: String,
    #[ts(as = "String")]
    pub sale_date: DateTime<Utc>,
    pub customer_name: String,
    #[ts(type = "number")]
    pub total_amount: Money,
    pub processed_by: String,
    pub processed_by_username: String,
    pub items: Vec<SaleListingItem>,
}

// =============================================================================
// Helpers
// =============================================================================

fn trim_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn normalize_optional_email(email: Option<String>) -> ValidationResult<Option<String>> {
    match trim_optional(email) {
        Some(email) => {
            validate_email(&email)?;
            Ok(Some(email.to_lowercase()))
        }
        None => Ok(None),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::PasswordHashError;

    struct ReversingHasher;

    impl PasswordHasher for ReversingHasher {
        fn hash(&self, plaintext: &str) -> Result<String, PasswordHashError> {
            Ok(format!("rev:{}", plaintext.chars().rev().collect::<String>()))
        }

        fn verify(&self, plaintext: &str, hash: &str) -> Result<bool, PasswordHashError> {
            Ok(self.hash(plaintext)? == hash)
        }
    }

    const SUPPLIER_ID: &str = "550e8400-e29b-41d4-a716-446655440000";

    fn new_product() -> NewProduct {
        NewProduct {
            sku: " BEAN-001 ".to_string(),
            name: "Espresso Beans".to_string(),
            description: Some("   ".to_string()),
            price: Money::from_cents(1250),
            stock_quantity: None,
            min_stock_level: None,
            supplier_id: SUPPLIER_ID.to_string(),
        }
    }

    #[test]
    fn test_user_role_default_and_parse() {
        assert_eq!(UserRole::default(), UserRole::Inventory);
        assert_eq!("sales".parse::<UserRole>().unwrap(), UserRole::Sales);
        assert_eq!("Admin".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert!("Cashier".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_user_role_json() {
        assert_eq!(serde_json::to_string(&UserRole::Admin).unwrap(), "\"Admin\"");
    }

    #[test]
    fn test_new_product_defaults() {
        let now = Utc::now();
        let product = new_product()
            .into_product("id-1".to_string(), "user-1", now)
            .unwrap();

        assert_eq!(product.sku, "BEAN-001");
        assert_eq!(product.stock_quantity, 0);
        assert_eq!(product.min_stock_level, DEFAULT_MIN_STOCK_LEVEL);
        assert_eq!(product.description, None);
        assert_eq!(product.created_by, "user-1");
        assert!(product.is_active);
        assert!(product.is_low_stock());
    }

    #[test]
    fn test_new_product_rejects_negative_values() {
        let mut input = new_product();
        input.price = Money::from_cents(-1);
        assert!(input
            .into_product("id".to_string(), "u", Utc::now())
            .is_err());

        let mut input = new_product();
        input.stock_quantity = Some(-3);
        assert!(input
            .into_product("id".to_string(), "u", Utc::now())
            .is_err());
    }

    #[test]
    fn test_pagination() {
        let p = Pagination::new(25, 1, 10);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_next_page);

        let p = Pagination::new(25, 3, 10);
        assert!(!p.has_next_page);

        let p = Pagination::new(0, 1, 10);
        assert_eq!(p.total_pages, 0);
        assert!(!p.has_next_page);
    }

    #[test]
    fn test_page_and_limit_defaults() {
        assert_eq!(page_and_limit(None, None), (1, DEFAULT_PAGE_SIZE));
        assert_eq!(page_and_limit(Some(0), Some(0)), (1, DEFAULT_PAGE_SIZE));
        assert_eq!(page_and_limit(Some(4), Some(1000)), (4, MAX_PAGE_SIZE));
    }

    #[test]
    fn test_new_user_hashes_and_normalizes() {
        let input = NewUserInput {
            username: " alice ".to_string(),
            email: "Alice@Example.COM".to_string(),
            password: "hunter22".to_string(),
            role: None,
        };
        let user = NewUser::create("id".to_string(), input, &ReversingHasher).unwrap();

        assert_eq!(user.username, "alice");
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.password_hash, "rev:22retnuh");
        assert_eq!(user.role, UserRole::Inventory);
    }

    #[test]
    fn test_user_changes_rehash_only_with_password() {
        let changes = UserChanges::from_input(
            UserUpdateInput {
                role: Some(UserRole::Sales),
                ..Default::default()
            },
            &ReversingHasher,
        )
        .unwrap();
        assert!(changes.password_hash.is_none());

        let changes = UserChanges::from_input(
            UserUpdateInput {
                password: Some("newpass1".to_string()),
                ..Default::default()
            },
            &ReversingHasher,
        )
        .unwrap();
        assert_eq!(changes.password_hash.as_deref(), Some("rev:1ssapwen"));
    }

    #[test]
    fn test_profile_omits_hash() {
        let now = Utc::now();
        let user = User {
            id: "u1".to_string(),
            username: "bob".to_string(),
            email: "bob@example.com".to_string(),
            password_hash: "secret-hash".to_string(),
            role: UserRole::Sales,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_string(&user.profile()).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(json.contains("\"role\":\"Sales\""));
    }

    #[test]
    fn test_supplier_email_lowercased() {
        let supplier = NewSupplier {
            name: "Acme".to_string(),
            contact_name: "Jo".to_string(),
            phone: None,
            email: Some(" Orders@Acme.IO ".to_string()),
            address: None,
        }
        .normalized()
        .unwrap();
        assert_eq!(supplier.email.as_deref(), Some("orders@acme.io"));
    }
}
