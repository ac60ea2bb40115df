//! HTTP routes, one file per resource.

use axum::routing::{get, post, put};
use axum::Router;
use serde::Serialize;

use crate::AppState;

pub mod auth;
pub mod health;
pub mod products;
pub mod reports;
pub mod sales;
pub mod suppliers;
pub mod users;

#[cfg(test)]
mod tests;

/// Body of responses that carry only a confirmation.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Router for every authenticated endpoint.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(products::list).post(products::create))
        .route(
            "/api/products/{id}",
            get(products::get)
                .put(products::update)
                .delete(products::delete),
        )
        .route("/api/products/{id}/stock", post(products::adjust_stock))
        .route("/api/suppliers", get(suppliers::list).post(suppliers::create))
        .route(
            "/api/suppliers/{id}",
            put(suppliers::update).delete(suppliers::delete),
        )
        .route("/api/users", get(users::list).post(users::create))
        .route(
            "/api/users/{id}",
            get(users::get).put(users::update).delete(users::delete),
        )
        .route("/api/sales", get(sales::list).post(sales::create))
        .route("/api/reports/low-stock", get(reports::low_stock))
        .route("/api/reports/sales-summary", get(reports::sales_summary))
}
