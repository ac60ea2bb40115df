use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::auth::Principal;
use crate::error::ApiResult;
use crate::{ApiQuery, AppState};
use stockroom_core::report::{LowStockReport, SalesPeriod, SalesSummaryReport};
use stockroom_core::Action;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummaryQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

pub async fn low_stock(
    principal: Principal,
    State(state): State<AppState>,
) -> ApiResult<Json<LowStockReport>> {
    principal.require(Action::LowStockReport)?;

    let products = state.db.products().low_stock().await?;
    Ok(Json(LowStockReport::new(Utc::now(), products)))
}

/// Per-product totals for sales inside `[startDate, endDate]`.
pub async fn sales_summary(
    principal: Principal,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SalesSummaryQuery>,
) -> ApiResult<Json<SalesSummaryReport>> {
    principal.require(Action::SalesSummaryReport)?;

    let period = SalesPeriod::parse(query.start_date.as_deref(), query.end_date.as_deref())?;
    let summary = state.db.sales().sales_summary(&period).await?;

    Ok(Json(SalesSummaryReport::new(period, summary)))
}
