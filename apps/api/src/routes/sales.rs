use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::Principal;
use crate::error::ApiResult;
use crate::{ApiJson, ApiQuery, AppState};
use stockroom_core::sale::SaleRequest;
use stockroom_core::{page_and_limit, Action, Sale, SaleListing};

#[derive(Debug, Serialize)]
pub struct SaleResponse {
    pub message: &'static str,
    pub sale: Sale,
}

#[derive(Debug, Default, Deserialize)]
pub struct SalesQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Records a sale. Prices and the total are computed server-side.
pub async fn create(
    principal: Principal,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SaleRequest>,
) -> ApiResult<(StatusCode, Json<SaleResponse>)> {
    principal.require(Action::RecordSale)?;

    let sale = state.sales.record_sale(&body, &principal.user_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(SaleResponse {
            message: "Sale recorded successfully",
            sale,
        }),
    ))
}

/// Newest first.
pub async fn list(
    principal: Principal,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SalesQuery>,
) -> ApiResult<Json<Vec<SaleListing>>> {
    principal.require(Action::ViewSales)?;

    let (page, limit) = page_and_limit(query.page, query.limit);
    Ok(Json(state.db.sales().list_recent(page, limit).await?))
}
