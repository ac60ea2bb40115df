use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::MessageResponse;
use crate::auth::Principal;
use crate::error::{ApiError, ApiResult};
use crate::{ApiJson, ApiQuery, AppState};
use stockroom_core::{
    Action, NewProduct, Pagination, Product, ProductFilter, ProductListing, ProductUpdate,
};
use stockroom_db::repository::product::generate_product_id;
use stockroom_db::DbError;

#[derive(Debug, Serialize)]
pub struct ProductListResponse {
    pub products: Vec<ProductListing>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct ProductDetailResponse {
    pub product: Product,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub message: &'static str,
    pub product: Product,
}

#[derive(Debug, Deserialize)]
pub struct StockAdjustment {
    pub delta: i64,
}

pub async fn list(
    principal: Principal,
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<ProductFilter>,
) -> ApiResult<Json<ProductListResponse>> {
    principal.require(Action::ViewProducts)?;

    let (products, pagination) = state.db.products().list(&filter).await?;
    Ok(Json(ProductListResponse {
        products,
        pagination,
    }))
}

/// Fetches one product, active or not.
pub async fn get(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ProductDetailResponse>> {
    principal.require(Action::ViewProducts)?;

    let product = state
        .db
        .products()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;
    Ok(Json(ProductDetailResponse { product }))
}

pub async fn create(
    principal: Principal,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<NewProduct>,
) -> ApiResult<(StatusCode, Json<ProductResponse>)> {
    principal.require(Action::CreateProduct)?;

    let product = body.into_product(generate_product_id(), &principal.user_id, Utc::now())?;
    let product = state.db.products().insert(&product).await?;

    info!(product_id = %product.id, sku = %product.sku, by = %principal.username, "Product created");
    Ok((
        StatusCode::CREATED,
        Json(ProductResponse {
            message: "Product created successfully",
            product,
        }),
    ))
}

pub async fn update(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<ProductUpdate>,
) -> ApiResult<Json<ProductResponse>> {
    principal.require(Action::UpdateProduct)?;

    let changes = body.normalized()?;
    let product = state.db.products().update(&id, &changes).await?;

    info!(product_id = %id, by = %principal.username, "Product updated");
    Ok(Json(ProductResponse {
        message: "Product updated successfully",
        product,
    }))
}

/// Applies a signed stock delta. Refuses to take stock below zero.
pub async fn adjust_stock(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<StockAdjustment>,
) -> ApiResult<Json<ProductResponse>> {
    principal.require(Action::AdjustStock)?;

    if body.delta == 0 {
        return Err(ApiError::bad_request(
            "VALIDATION_ERROR",
            "delta must not be zero",
        ));
    }

    let product = state.db.products().adjust_stock(&id, body.delta).await?;

    info!(
        product_id = %id,
        delta = body.delta,
        stock = product.stock_quantity,
        by = %principal.username,
        "Stock adjusted"
    );
    Ok(Json(ProductResponse {
        message: "Stock adjusted successfully",
        product,
    }))
}

/// Hard delete. Products already referenced by a sale must be deactivated
/// instead.
pub async fn delete(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    principal.require(Action::DeleteProduct)?;

    match state.db.products().delete(&id).await {
        Ok(()) => {}
        Err(DbError::ForeignKeyViolation { .. }) => {
            return Err(ApiError::bad_request(
                "STILL_REFERENCED",
                "Product appears in recorded sales. Set isActive to false instead",
            ));
        }
        Err(e) => return Err(e.into()),
    }

    info!(product_id = %id, by = %principal.username, "Product deleted");
    Ok(Json(MessageResponse {
        message: "Product deleted successfully",
    }))
}
