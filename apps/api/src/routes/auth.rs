use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::{ApiJson, AppState};
use stockroom_core::UserProfile;

const INVALID_CREDENTIALS: &str = "Invalid username or password";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

/// Exchanges credentials for a session token.
///
/// An unknown username and a wrong password produce the same 401.
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    if body.username.trim().is_empty() || body.password.is_empty() {
        return Err(ApiError::bad_request(
            "VALIDATION_ERROR",
            "Username and password are required",
        ));
    }

    let Some(user) = state
        .db
        .users()
        .find_credentials_by_username(&body.username)
        .await?
    else {
        debug!(username = %body.username.trim(), "Login for unknown user");
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    };

    // Argon2 runs on the blocking pool
    let hasher = state.hasher.clone();
    let password = body.password;
    let stored_hash = user.password_hash.clone();
    let verified = tokio::task::spawn_blocking(move || hasher.verify(&password, &stored_hash))
        .await
        .map_err(ApiError::internal)?
        .map_err(ApiError::internal)?;
    if !verified {
        debug!(user_id = %user.id, "Login with wrong password");
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    }

    let token = state.jwt.issue(&user)?;
    info!(user_id = %user.id, role = %user.role, "User logged in");

    Ok(Json(LoginResponse {
        token,
        user: user.profile(),
    }))
}
