//! # Sale Transaction Coordinator
//!
//! Records a sale as one all-or-nothing unit: N stock decrements plus one
//! sale insert commit together or not at all.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  record_sale(request, actor)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  request.validate()          ← no store access on failure               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌──────────────────── attempt (≤ max_attempts) ────────────────────┐   │
//! │  │ begin → lock_products → price_sale → decrement × N → insert_sale │   │
//! │  │        │                                                         │   │
//! │  │        ├── Ok         → commit                                   │   │
//! │  │        ├── domain err → rollback, return it                      │   │
//! │  │        ├── Busy       → rollback, back off, next attempt         │   │
//! │  │        └── other db   → rollback, PersistenceFailure             │   │
//! │  └──────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  attempts exhausted → ConcurrencyConflict                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use chrono::Utc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::DbError;
use crate::unit_of_work::{SaleStore, SaleUnitOfWork, StockDecrement};
use stockroom_core::sale::{price_sale, SaleRequest};
use stockroom_core::{CoreError, Sale, ValidationError};

// =============================================================================
// Errors
// =============================================================================

/// Why a sale was not recorded.
#[derive(Debug, Error)]
pub enum SaleError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: String },

    #[error("Insufficient stock for {product_name}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        product_name: String,
        available: i64,
        requested: i64,
    },

    /// Lock contention outlasted every attempt. Safe to retry later.
    #[error("The sale could not be completed due to concurrent activity, please retry")]
    ConcurrencyConflict { attempts: u32 },

    /// Storage failed for a reason other than contention.
    #[error("The sale could not be recorded")]
    PersistenceFailure(DbError),
}

impl From<CoreError> for SaleError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(product_id) => SaleError::ProductNotFound { product_id },
            CoreError::InsufficientStock {
                product_id,
                product_name,
                available,
                requested,
            } => SaleError::InsufficientStock {
                product_id,
                product_name,
                available,
                requested,
            },
            CoreError::Validation(e) => SaleError::Validation(e),
            CoreError::AmountOverflow { context } => {
                SaleError::Validation(ValidationError::InvalidFormat {
                    field: "items".to_string(),
                    reason: format!("{context} is out of range"),
                })
            }
            CoreError::PasswordHash(e) => {
                SaleError::PersistenceFailure(DbError::Internal(e.to_string()))
            }
        }
    }
}

/// Contention counts as one conflicted attempt; anything else is a
/// persistence failure.
impl From<DbError> for SaleError {
    fn from(err: DbError) -> Self {
        if err.is_transient() {
            SaleError::ConcurrencyConflict { attempts: 1 }
        } else {
            SaleError::PersistenceFailure(err)
        }
    }
}

impl SaleError {
    /// Whether the caller may resubmit the same request unchanged.
    pub fn is_transient(&self) -> bool {
        matches!(self, SaleError::ConcurrencyConflict { .. })
    }
}

// =============================================================================
// Retry Policy
// =============================================================================

/// How often and how patiently a conflicted sale is re-run.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first. Default: 3
    pub max_attempts: u32,
    /// Delay before the second attempt. Default: 25ms
    pub initial_interval: Duration,
    /// Upper bound for any single delay. Default: 500ms
    pub max_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            initial_interval: Duration::from_millis(25),
            max_interval: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self
    }

    pub fn max_interval(mut self, interval: Duration) -> Self {
        self.max_interval = interval;
        self
    }

    /// Fresh backoff schedule for one `record_sale` call.
    fn backoff(&self) -> ExponentialBackoff {
        let mut backoff = ExponentialBackoff {
            initial_interval: self.initial_interval,
            max_interval: self.max_interval,
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        };
        backoff.reset();
        backoff
    }
}

// =============================================================================
// Coordinator
// =============================================================================

/// Runs sale units of work against a [`SaleStore`].
///
/// ## Usage
/// ```rust,ignore
/// let coordinator = SaleCoordinator::new(db.sale_store());
/// let sale = coordinator.record_sale(&request, &principal.user_id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct SaleCoordinator<S> {
    store: S,
    retry: RetryPolicy,
}

impl<S: SaleStore> SaleCoordinator<S> {
    pub fn new(store: S) -> Self {
        SaleCoordinator {
            store,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Records a sale for an already authorized `actor_id`.
    ///
    /// Prices and the total come from the catalog as read inside the unit
    /// of work; nothing monetary is taken from `request`.
    pub async fn record_sale(&self, request: &SaleRequest, actor_id: &str) -> Result<Sale, SaleError> {
        request.validate()?;

        debug!(
            lines = request.items.len(),
            actor = %actor_id,
            "Recording sale"
        );

        let mut backoff = self.retry.backoff();
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            match self.attempt(request, actor_id).await {
                Ok(sale) => {
                    info!(
                        sale_id = %sale.id,
                        total = %sale.total_amount,
                        lines = sale.items.len(),
                        attempt,
                        "Sale recorded"
                    );
                    return Ok(sale);
                }
                Err(SaleError::ConcurrencyConflict { .. }) if attempt < self.retry.max_attempts => {
                    let delay = backoff
                        .next_backoff()
                        .unwrap_or(self.retry.max_interval);
                    warn!(
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Sale hit lock contention, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(SaleError::ConcurrencyConflict { .. }) => {
                    warn!(attempts = attempt, "Sale abandoned after repeated contention");
                    return Err(SaleError::ConcurrencyConflict { attempts: attempt });
                }
                Err(SaleError::PersistenceFailure(e)) => {
                    error!(error = %e, "Sale persistence failed");
                    return Err(SaleError::PersistenceFailure(e));
                }
                Err(e) => {
                    debug!(error = %e, "Sale rejected");
                    return Err(e);
                }
            }
        }
    }

    /// One begin..commit cycle. Any error rolls the unit back.
    async fn attempt(&self, request: &SaleRequest, actor_id: &str) -> Result<Sale, SaleError> {
        let mut unit = self.store.begin().await?;

        match write_sale(&mut unit, request, actor_id).await {
            Ok(sale) => {
                unit.commit().await?;
                Ok(sale)
            }
            Err(e) => {
                if let Err(rollback_err) = unit.rollback().await {
                    warn!(error = %rollback_err, "Rollback after failed sale also failed");
                }
                Err(e)
            }
        }
    }
}

async fn write_sale<U: SaleUnitOfWork>(
    unit: &mut U,
    request: &SaleRequest,
    actor_id: &str,
) -> Result<Sale, SaleError> {
    let ids = request.distinct_product_ids();
    let products = unit.lock_products(&ids).await?;

    let priced = price_sale(request, &products)?;

    for demand in &priced.demand {
        match unit
            .decrement_stock(&demand.product_id, demand.quantity)
            .await?
        {
            StockDecrement::Applied => {}
            StockDecrement::Insufficient { available } => {
                return Err(SaleError::InsufficientStock {
                    product_id: demand.product_id.clone(),
                    product_name: demand.product_name.clone(),
                    available,
                    requested: demand.quantity,
                });
            }
            StockDecrement::Missing => {
                return Err(SaleError::ProductNotFound {
                    product_id: demand.product_id.clone(),
                });
            }
        }
    }

    let sale = priced.into_sale(
        Uuid::new_v4().to_string(),
        request.customer_name.as_deref(),
        actor_id,
        Utc::now(),
    );
    unit.insert_sale(&sale).await?;

    Ok(sale)
}

// =============================================================================
// Unit Tests
// =============================================================================
