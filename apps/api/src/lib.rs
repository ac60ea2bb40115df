//! # Stockroom API
//!
//! JSON over HTTP for the Stockroom web client.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Stockroom API                                  │
//! │                                                                         │
//! │  public:     GET /health, POST /api/auth/login                          │
//! │                                                                         │
//! │  protected:  auth_middleware ─► Principal ─► handler                    │
//! │              ┌──────────┐ ┌───────────┐ ┌───────┐ ┌───────┐ ┌─────────┐ │
//! │              │ products │ │ suppliers │ │ users │ │ sales │ │ reports │ │
//! │              └────┬─────┘ └─────┬─────┘ └───┬───┘ └───┬───┘ └────┬────┘ │
//! │                   └─────────────┴───────────┼─────────┴──────────┘      │
//! │                                             ▼                           │
//! │                      stockroom-db (repositories, SaleCoordinator)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables:
//! - `HTTP_PORT` - listen port (default: 3000)
//! - `DATABASE_PATH` - SQLite file (default: ./stockroom.db)
//! - `DB_MAX_CONNECTIONS` - pool size (default: 5)
//! - `JWT_SECRET` - HS256 signing secret
//! - `JWT_LIFETIME_SECS` - session lifetime (default: 86400)
//! - `SALE_MAX_ATTEMPTS` - attempts per sale under contention (default: 3)
//! - `CLIENT_ORIGIN` - web client origin (default: http://localhost:5173)

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::extract::{FromRequest, FromRequestParts};
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;

use stockroom_core::PasswordHasher;
use stockroom_db::{Database, RetryPolicy, SaleCoordinator, SqliteSaleStore};

// Re-exports
pub use auth::{Argon2PasswordHasher, JwtManager, Principal};
pub use config::{ApiConfig, ConfigError};
pub use error::{ApiError, ApiResult};

/// Shared application state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: Arc<JwtManager>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub sales: Arc<SaleCoordinator<SqliteSaleStore>>,
}

impl AppState {
    pub fn new(db: Database, config: &ApiConfig) -> Self {
        Self::with_hasher(db, config, Arc::new(Argon2PasswordHasher))
    }

    /// Same as [`AppState::new`] with a caller-supplied hashing backend.
    pub fn with_hasher(db: Database, config: &ApiConfig, hasher: Arc<dyn PasswordHasher>) -> Self {
        let retry = RetryPolicy::default().max_attempts(config.sale_max_attempts);
        let sales = SaleCoordinator::new(db.sale_store()).with_retry_policy(retry);

        AppState {
            jwt: Arc::new(JwtManager::new(&config.jwt_secret, config.jwt_lifetime_secs)),
            hasher,
            sales: Arc::new(sales),
            db,
        }
    }
}

/// JSON body extractor whose rejection is an [`ApiError`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor whose rejection is an [`ApiError`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Builds the full HTTP router.
pub fn router(state: AppState) -> Router {
    let protected = routes::router().route_layer(from_fn_with_state(
        state.clone(),
        auth::auth_middleware,
    ));

    Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/auth/login", post(routes::auth::login))
        .merge(protected)
        .with_state(state)
}
