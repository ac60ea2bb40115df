//! Router tests. Requests go through the full middleware stack against an
//! in-memory database.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use crate::config::ApiConfig;
use crate::{router, AppState};
use stockroom_core::{NewUser, NewUserInput, PasswordHashError, PasswordHasher, User, UserRole};
use stockroom_db::{Database, DbConfig};

/// Reversible stand-in for argon2 so tests stay fast.
struct PlainHasher;

impl PasswordHasher for PlainHasher {
    fn hash(&self, plaintext: &str) -> Result<String, PasswordHashError> {
        Ok(format!("plain:{plaintext}"))
    }

    fn verify(&self, plaintext: &str, hash: &str) -> Result<bool, PasswordHashError> {
        Ok(hash == format!("plain:{plaintext}"))
    }
}

struct TestApp {
    app: Router,
    state: AppState,
    admin: User,
    admin_token: String,
    inventory_token: String,
    sales_token: String,
}

async fn create_user(state: &AppState, username: &str, role: UserRole) -> User {
    let input = NewUserInput {
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password: "secret123".to_string(),
        role: Some(role),
    };
    let new_user = NewUser::create(Uuid::new_v4().to_string(), input, &PlainHasher).unwrap();
    state.db.users().insert(&new_user).await.unwrap()
}

async fn setup() -> TestApp {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let config = ApiConfig {
        jwt_secret: "router-test-secret".to_string(),
        ..ApiConfig::default()
    };
    let state = AppState::with_hasher(db, &config, Arc::new(PlainHasher));

    let admin = create_user(&state, "admin", UserRole::Admin).await;
    let inventory = create_user(&state, "stocker", UserRole::Inventory).await;
    let sales = create_user(&state, "seller", UserRole::Sales).await;

    TestApp {
        app: router(state.clone()),
        admin_token: state.jwt.issue(&admin).unwrap(),
        inventory_token: state.jwt.issue(&inventory).unwrap(),
        sales_token: state.jwt.issue(&sales).unwrap(),
        admin,
        state,
    }
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, value)
}

async fn create_supplier(t: &TestApp, name: &str) -> String {
    let (status, body) = send(
        &t.app,
        Method::POST,
        "/api/suppliers",
        Some(&t.inventory_token),
        Some(json!({ "name": name, "contactName": "Pat Morgan", "phone": "555-0100" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["supplier"]["id"].as_str().unwrap().to_string()
}

async fn create_product(t: &TestApp, supplier_id: &str, sku: &str, price: f64, stock: i64) -> String {
    let (status, body) = send(
        &t.app,
        Method::POST,
        "/api/products",
        Some(&t.inventory_token),
        Some(json!({
            "sku": sku,
            "name": format!("Product {sku}"),
            "price": price,
            "stockQuantity": stock,
            "supplierId": supplier_id,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["product"]["id"].as_str().unwrap().to_string()
}

// =============================================================================
// Public endpoints
// =============================================================================

#[tokio::test]
async fn test_health() {
    let t = setup().await;
    let (status, body) = send(&t.app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("OK"));
}

#[tokio::test]
async fn test_login_returns_token_and_profile() {
    let t = setup().await;
    let (status, body) = send(
        &t.app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "username": "seller", "password": "secret123" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["user"]["username"], "seller");
    assert_eq!(body["user"]["role"], "Sales");
    assert!(body["user"].get("passwordHash").is_none());

    let token = body["token"].as_str().unwrap();
    let (status, _) = send(&t.app, Method::GET, "/api/sales", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let t = setup().await;
    let (wrong_status, wrong_body) = send(
        &t.app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "username": "seller", "password": "nope-nope" })),
    )
    .await;
    let (unknown_status, unknown_body) = send(
        &t.app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "username": "nobody", "password": "secret123" })),
    )
    .await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body, unknown_body);
}

// =============================================================================
// Auth guard
// =============================================================================

#[tokio::test]
async fn test_missing_or_bad_token_is_unauthorized() {
    let t = setup().await;

    let (status, body) = send(&t.app, Method::GET, "/api/products", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = send(&t.app, Method::GET, "/api/products", Some("not.a.jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_of_deleted_user_is_rejected() {
    let t = setup().await;
    let temp = create_user(&t.state, "temporary", UserRole::Inventory).await;
    let token = t.state.jwt.issue(&temp).unwrap();

    let (status, _) = send(
        &t.app,
        Method::DELETE,
        &format!("/api/users/{}", temp.id),
        Some(&t.admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&t.app, Method::GET, "/api/products", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_role_gate_names_allowed_roles() {
    let t = setup().await;
    let supplier_id = create_supplier(&t, "Acme").await;

    let (status, body) = send(
        &t.app,
        Method::POST,
        "/api/products",
        Some(&t.sales_token),
        Some(json!({ "sku": "X-1", "name": "X", "price": 1, "supplierId": supplier_id })),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .ends_with("Required role: Admin or Inventory"));
}

// =============================================================================
// Products & suppliers
// =============================================================================

#[tokio::test]
async fn test_product_create_list_and_duplicate_sku() {
    let t = setup().await;
    let supplier_id = create_supplier(&t, "Acme").await;
    create_product(&t, &supplier_id, "BEAN-001", 12.5, 40).await;

    let (status, body) = send(
        &t.app,
        Method::GET,
        "/api/products?keyword=bean",
        Some(&t.sales_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["products"].as_array().unwrap().len(), 1);
    assert_eq!(body["products"][0]["supplierName"], "Acme");
    assert_eq!(body["pagination"]["totalProducts"], 1);

    let (status, body) = send(
        &t.app,
        Method::POST,
        "/api/products",
        Some(&t.inventory_token),
        Some(json!({ "sku": "BEAN-001", "name": "Again", "price": 1, "supplierId": supplier_id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "DUPLICATE");
}

#[tokio::test]
async fn test_invalid_body_is_bad_request() {
    let t = setup().await;
    let (status, body) = send(
        &t.app,
        Method::POST,
        "/api/products",
        Some(&t.inventory_token),
        Some(json!({ "sku": "NO-PRICE" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_BODY");
}

#[tokio::test]
async fn test_stock_adjustment_cannot_go_negative() {
    let t = setup().await;
    let supplier_id = create_supplier(&t, "Acme").await;
    let product_id = create_product(&t, &supplier_id, "ADJ-1", 2.0, 5).await;
    let uri = format!("/api/products/{product_id}/stock");

    let (status, body) = send(&t.app, Method::POST, &uri, Some(&t.inventory_token), Some(json!({ "delta": 7 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["product"]["stockQuantity"], 12);

    let (status, body) = send(&t.app, Method::POST, &uri, Some(&t.inventory_token), Some(json!({ "delta": -13 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");
}

#[tokio::test]
async fn test_stock_adjustment_cannot_overflow() {
    let t = setup().await;
    let supplier_id = create_supplier(&t, "Acme").await;
    let product_id = create_product(&t, &supplier_id, "BIG-1", 2.0, 5).await;

    let (status, body) = send(
        &t.app,
        Method::POST,
        &format!("/api/products/{product_id}/stock"),
        Some(&t.inventory_token),
        Some(json!({ "delta": i64::MAX })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = send(&t.app, Method::GET, "/api/products", Some(&t.inventory_token), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["products"][0]["stockQuantity"], 5);

    let (status, body) = send(&t.app, Method::GET, &format!("/api/products/{product_id}"), Some(&t.sales_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["product"]["stockQuantity"], 5);
}

#[tokio::test]
async fn test_supplier_with_products_cannot_be_deleted() {
    let t = setup().await;
    let supplier_id = create_supplier(&t, "Acme").await;
    create_product(&t, &supplier_id, "REF-1", 1.0, 1).await;

    let (status, body) = send(
        &t.app,
        Method::DELETE,
        &format!("/api/suppliers/{supplier_id}"),
        Some(&t.admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "STILL_REFERENCED");

    let (status, _) = send(
        &t.app,
        Method::DELETE,
        &format!("/api/suppliers/{}", Uuid::new_v4()),
        Some(&t.admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sold_product_must_be_deactivated_not_deleted() {
    let t = setup().await;
    let supplier_id = create_supplier(&t, "Acme").await;
    let product_id = create_product(&t, &supplier_id, "SOLD-1", 3.0, 10).await;

    let (status, _) = send(
        &t.app,
        Method::POST,
        "/api/sales",
        Some(&t.sales_token),
        Some(json!({ "items": [{ "productId": product_id, "quantity": 1 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = format!("/api/products/{product_id}");
    let (status, body) = send(&t.app, Method::DELETE, &uri, Some(&t.admin_token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "STILL_REFERENCED");

    let (status, body) = send(
        &t.app,
        Method::PUT,
        &uri,
        Some(&t.inventory_token),
        Some(json!({ "isActive": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["product"]["isActive"], false);
}

#[tokio::test]
async fn test_deactivated_product_can_be_found_and_reactivated() {
    let t = setup().await;
    let supplier_id = create_supplier(&t, "Acme").await;
    let product_id = create_product(&t, &supplier_id, "OFF-1", 3.0, 10).await;
    create_product(&t, &supplier_id, "ON-1", 3.0, 10).await;
    let uri = format!("/api/products/{product_id}");

    let (status, _) = send(&t.app, Method::PUT, &uri, Some(&t.inventory_token), Some(json!({ "isActive": false }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&t.app, Method::GET, &uri, Some(&t.sales_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["product"]["sku"], "OFF-1");
    assert_eq!(body["product"]["isActive"], false);

    let (_, body) = send(&t.app, Method::GET, "/api/products", Some(&t.inventory_token), None).await;
    assert_eq!(body["pagination"]["totalProducts"], 2);

    let (status, body) = send(&t.app, Method::GET, "/api/products?isActive=false", Some(&t.inventory_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["products"].as_array().unwrap().len(), 1);
    assert_eq!(body["products"][0]["id"], json!(product_id));
    assert_eq!(body["products"][0]["isActive"], false);

    let (status, body) = send(&t.app, Method::PUT, &uri, Some(&t.inventory_token), Some(json!({ "isActive": true }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["product"]["isActive"], true);

    let (_, body) = send(&t.app, Method::GET, "/api/products?isActive=true", Some(&t.inventory_token), None).await;
    assert_eq!(body["products"].as_array().unwrap().len(), 2);

    let (status, body) = send(&t.app, Method::GET, &format!("/api/products/{}", Uuid::new_v4()), Some(&t.sales_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

// =============================================================================
// Sales
// =============================================================================

#[tokio::test]
async fn test_sale_flow_prevents_overselling() {
    let t = setup().await;
    let supplier_id = create_supplier(&t, "Acme").await;
    let product_id = create_product(&t, &supplier_id, "SALE-1", 9.99, 10).await;
    let sale = json!({
        "items": [{ "productId": product_id, "quantity": 6 }],
        "customerName": "Dana",
    });

    let (status, body) = send(&t.app, Method::POST, "/api/sales", Some(&t.sales_token), Some(sale.clone())).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["sale"]["totalAmount"], json!(59.94));
    assert_eq!(body["sale"]["items"][0]["priceAtSale"], json!(9.99));
    assert_eq!(body["sale"]["customerName"], "Dana");

    let (status, body) = send(&t.app, Method::POST, "/api/sales", Some(&t.sales_token), Some(sale)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");

    let (_, body) = send(&t.app, Method::GET, "/api/products", Some(&t.sales_token), None).await;
    assert_eq!(body["products"][0]["stockQuantity"], 4);

    let (status, body) = send(&t.app, Method::GET, "/api/sales", Some(&t.admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["processedByUsername"], "seller");
}

#[tokio::test]
async fn test_sale_rejections() {
    let t = setup().await;

    let (status, body) = send(
        &t.app,
        Method::POST,
        "/api/sales",
        Some(&t.sales_token),
        Some(json!({ "items": [{ "productId": Uuid::new_v4().to_string(), "quantity": 1 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "PRODUCT_NOT_FOUND");

    let (status, body) = send(
        &t.app,
        Method::POST,
        "/api/sales",
        Some(&t.sales_token),
        Some(json!({ "items": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = send(
        &t.app,
        Method::POST,
        "/api/sales",
        Some(&t.inventory_token),
        Some(json!({ "items": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// =============================================================================
// Users
// =============================================================================

#[tokio::test]
async fn test_user_management() {
    let t = setup().await;

    let (status, body) = send(
        &t.app,
        Method::POST,
        "/api/users",
        Some(&t.admin_token),
        Some(json!({ "username": "newbie", "email": "Newbie@Example.com", "password": "hunter22" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["user"]["role"], "Inventory");
    assert_eq!(body["user"]["email"], "newbie@example.com");
    let id = body["user"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &t.app,
        Method::PUT,
        &format!("/api/users/{id}"),
        Some(&t.admin_token),
        Some(json!({ "role": "Sales" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "Sales");

    let (status, _) = send(
        &t.app,
        Method::PUT,
        &format!("/api/users/{id}"),
        Some(&t.admin_token),
        Some(json!({ "password": "changed99" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(
        &t.app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "username": "newbie", "password": "changed99" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&t.app, Method::GET, &format!("/api/users/{id}"), Some(&t.admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "newbie");

    let (status, body) = send(&t.app, Method::GET, "/api/users", Some(&t.admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 4);

    let (status, _) = send(&t.app, Method::GET, "/api/users", Some(&t.inventory_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_cannot_delete_self() {
    let t = setup().await;
    let (status, body) = send(
        &t.app,
        Method::DELETE,
        &format!("/api/users/{}", t.admin.id),
        Some(&t.admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

// =============================================================================
// Reports
// =============================================================================

#[tokio::test]
async fn test_low_stock_report() {
    let t = setup().await;
    let supplier_id = create_supplier(&t, "Acme").await;
    create_product(&t, &supplier_id, "LOW-1", 1.0, 3).await;
    create_product(&t, &supplier_id, "OK-1", 1.0, 50).await;

    let (status, body) = send(&t.app, Method::GET, "/api/reports/low-stock", Some(&t.inventory_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["products"][0]["sku"], "LOW-1");
    assert_eq!(body["products"][0]["supplierPhone"], "555-0100");

    let (status, _) = send(&t.app, Method::GET, "/api/reports/low-stock", Some(&t.sales_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_sales_summary_report() {
    let t = setup().await;
    let supplier_id = create_supplier(&t, "Acme").await;
    let product_id = create_product(&t, &supplier_id, "SUM-1", 9.99, 20).await;

    for quantity in [2, 4] {
        let (status, _) = send(
            &t.app,
            Method::POST,
            "/api/sales",
            Some(&t.sales_token),
            Some(json!({ "items": [{ "productId": product_id, "quantity": quantity }] })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(
        &t.app,
        Method::GET,
        "/api/reports/sales-summary?startDate=2000-01-01&endDate=2999-12-31",
        Some(&t.sales_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["totalItems"], 1);
    assert_eq!(body["summary"][0]["totalQuantitySold"], 6);
    assert_eq!(body["summary"][0]["totalRevenue"], json!(59.94));
    assert_eq!(body["summary"][0]["countSales"], 2);

    let (status, body) = send(
        &t.app,
        Method::GET,
        "/api/reports/sales-summary?startDate=2024-01-01",
        Some(&t.sales_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}
