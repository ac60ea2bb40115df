use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::info;

use super::MessageResponse;
use crate::auth::Principal;
use crate::error::ApiResult;
use crate::{ApiJson, AppState};
use stockroom_core::{Action, NewSupplier, Supplier, SupplierUpdate};

#[derive(Debug, Serialize)]
pub struct SupplierResponse {
    pub message: &'static str,
    pub supplier: Supplier,
}

pub async fn list(principal: Principal, State(state): State<AppState>) -> ApiResult<Json<Vec<Supplier>>> {
    principal.require(Action::ViewSuppliers)?;
    Ok(Json(state.db.suppliers().list().await?))
}

pub async fn create(
    principal: Principal,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<NewSupplier>,
) -> ApiResult<(StatusCode, Json<SupplierResponse>)> {
    principal.require(Action::CreateSupplier)?;

    let supplier = state.db.suppliers().create(&body.normalized()?).await?;

    info!(supplier_id = %supplier.id, name = %supplier.name, by = %principal.username, "Supplier created");
    Ok((
        StatusCode::CREATED,
        Json(SupplierResponse {
            message: "Supplier registered successfully",
            supplier,
        }),
    ))
}

pub async fn update(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<SupplierUpdate>,
) -> ApiResult<Json<SupplierResponse>> {
    principal.require(Action::UpdateSupplier)?;

    let supplier = state.db.suppliers().update(&id, &body.normalized()?).await?;

    info!(supplier_id = %id, by = %principal.username, "Supplier updated");
    Ok(Json(SupplierResponse {
        message: "Supplier updated successfully",
        supplier,
    }))
}

/// Refused while any product still references the supplier.
pub async fn delete(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    principal.require(Action::DeleteSupplier)?;

    state.db.suppliers().delete(&id).await?;

    info!(supplier_id = %id, by = %principal.username, "Supplier deleted");
    Ok(Json(MessageResponse {
        message: "Supplier deleted successfully",
    }))
}
