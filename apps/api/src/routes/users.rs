use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::MessageResponse;
use crate::auth::Principal;
use crate::error::{ApiError, ApiResult};
use crate::{ApiJson, AppState};
use stockroom_core::{Action, NewUser, NewUserInput, UserChanges, UserProfile, UserUpdateInput};

#[derive(Debug, Serialize)]
pub struct UserEnvelope {
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub message: &'static str,
    pub user: UserProfile,
}

pub async fn list(
    principal: Principal,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<UserProfile>>> {
    principal.require(Action::ManageUsers)?;

    let users = state.db.users().list().await?;
    Ok(Json(users.iter().map(|u| u.profile()).collect()))
}

pub async fn get(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<UserEnvelope>> {
    principal.require(Action::ManageUsers)?;

    let user = state
        .db
        .users()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(UserEnvelope {
        user: user.profile(),
    }))
}

pub async fn create(
    principal: Principal,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<NewUserInput>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    principal.require(Action::ManageUsers)?;

    let hasher = state.hasher.clone();
    let new_user = tokio::task::spawn_blocking(move || {
        NewUser::create(Uuid::new_v4().to_string(), body, hasher.as_ref())
    })
    .await
    .map_err(ApiError::internal)??;
    let user = state.db.users().insert(&new_user).await?;

    info!(user_id = %user.id, role = %user.role, by = %principal.username, "User created");
    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            message: "User created successfully",
            user: user.profile(),
        }),
    ))
}

/// Partial update. A supplied password is rehashed; an absent one is kept.
pub async fn update(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UserUpdateInput>,
) -> ApiResult<Json<UserResponse>> {
    principal.require(Action::ManageUsers)?;

    let hasher = state.hasher.clone();
    let changes = tokio::task::spawn_blocking(move || UserChanges::from_input(body, hasher.as_ref()))
        .await
        .map_err(ApiError::internal)??;
    let user = state.db.users().update(&id, &changes).await?;

    info!(user_id = %id, by = %principal.username, "User updated");
    Ok(Json(UserResponse {
        message: "User updated successfully",
        user: user.profile(),
    }))
}

pub async fn delete(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    principal.require(Action::ManageUsers)?;

    if id == principal.user_id {
        return Err(ApiError::forbidden(
            "An administrator cannot delete their own account while logged in",
        ));
    }

    state.db.users().delete(&id).await?;

    info!(user_id = %id, by = %principal.username, "User deleted");
    Ok(Json(MessageResponse {
        message: "User deleted successfully",
    }))
}
