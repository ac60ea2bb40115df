//! # Sale Pricing
//!
//! Pure steps of recording a sale: request validation, per-product demand
//! aggregation, availability checks, price locking and the total.
//!
//! ## Flow
//! ```text
//! SaleRequest ──validate()──► distinct ids ──(store reads products)──► price_sale()
//!                                                                         │
//!   ┌─────────────────────────────────────────────────────────────────────┘
//!   ▼
//! PricedSale { lines (request order), demand (per product), total_amount }
//!   │
//!   └──into_sale(id, customer, actor, now)──► Sale
//! ```
//!
//! Storage and concurrency live in `stockroom-db`. Nothing here touches I/O.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Product, Sale, SaleItem};
use crate::validation::{validate_quantity, ValidationResult};
use crate::DEFAULT_CUSTOMER_NAME;

// =============================================================================
// Request
// =============================================================================

/// One requested line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleLineRequest {
    #[serde(alias = "product")]
    pub product_id: String,
    pub quantity: i64,
}

impl SaleLineRequest {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        SaleLineRequest {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// A sale as submitted by a client. Prices and totals are never taken from
/// here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleRequest {
    pub items: Vec<SaleLineRequest>,
    #[serde(default)]
    pub customer_name: Option<String>,
}

impl SaleRequest {
    pub fn new(items: Vec<SaleLineRequest>) -> Self {
        SaleRequest {
            items,
            customer_name: None,
        }
    }

    pub fn with_customer(mut self, name: impl Into<String>) -> Self {
        self.customer_name = Some(name.into());
        self
    }

    /// Checks shape only: at least one line, each with a product id and a
    /// positive quantity.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.items.is_empty() {
            return Err(ValidationError::Empty {
                field: "items".to_string(),
            });
        }

        for line in &self.items {
            if line.product_id.trim().is_empty() {
                return Err(ValidationError::Required {
                    field: "productId".to_string(),
                });
            }
            validate_quantity(line.quantity)?;
        }

        Ok(())
    }

    /// Distinct product ids in first-appearance order.
    pub fn distinct_product_ids(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.items
            .iter()
            .filter(|line| seen.insert(line.product_id.as_str()))
            .map(|line| line.product_id.clone())
            .collect()
    }

    /// Requested quantity summed per distinct product, first-appearance order.
    pub fn aggregated_quantities(&self) -> CoreResult<Vec<(String, i64)>> {
        let mut order: Vec<(String, i64)> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();

        for line in &self.items {
            match index.get(line.product_id.as_str()) {
                Some(&i) => {
                    let entry = &mut order[i];
                    entry.1 = entry.1.checked_add(line.quantity).ok_or_else(|| {
                        ValidationError::OutOfRange {
                            field: "quantity".to_string(),
                            min: 1,
                            max: i64::MAX,
                        }
                    })?;
                }
                None => {
                    index.insert(line.product_id.as_str(), order.len());
                    order.push((line.product_id.clone(), line.quantity));
                }
            }
        }

        Ok(order)
    }
}

/// Uses the trimmed name, or the default when missing or blank.
pub fn resolve_customer_name(name: Option<&str>) -> String {
    name.map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_CUSTOMER_NAME)
        .to_string()
}

// =============================================================================
// Pricing
// =============================================================================

/// Stock to take from one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockDemand {
    pub product_id: String,
    pub product_name: String,
    pub available: i64,
    pub quantity: i64,
}

/// Outcome of pricing a request against a consistent product snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedSale {
    /// Sale lines in request order, each with its locked price.
    pub lines: Vec<SaleItem>,
    /// One entry per distinct product, first-appearance order.
    pub demand: Vec<StockDemand>,
    pub total_amount: Money,
}

impl PricedSale {
    /// Builds the sale record.
    pub fn into_sale(
        self,
        id: String,
        customer_name: Option<&str>,
        processed_by: &str,
        now: DateTime<Utc>,
    ) -> Sale {
        Sale {
            id,
            sale_date: now,
            customer_name: resolve_customer_name(customer_name),
            items: self.lines,
            total_amount: self.total_amount,
            processed_by: processed_by.to_string(),
            created_at: now,
        }
    }
}

/// Prices a validated request against the products read for it.
///
/// ## Rules
/// - Every requested id must be present and active, else `ProductNotFound`
/// - Aggregated demand per product must not exceed its stock, else
///   `InsufficientStock` carrying the aggregated amount
/// - Each line takes the product's current price
/// - The total is the exact sum of line amounts rounded once to cents
pub fn price_sale(request: &SaleRequest, products: &[Product]) -> CoreResult<PricedSale> {
    let by_id: HashMap<&str, &Product> = products
        .iter()
        .filter(|p| p.is_active)
        .map(|p| (p.id.as_str(), p))
        .collect();

    let aggregated = request.aggregated_quantities()?;

    // Every id must resolve before any stock check runs.
    let mut resolved = Vec::with_capacity(aggregated.len());
    for (product_id, quantity) in aggregated {
        let product = *by_id
            .get(product_id.as_str())
            .ok_or_else(|| CoreError::ProductNotFound(product_id.clone()))?;
        resolved.push((product_id, quantity, product));
    }

    let mut demand = Vec::with_capacity(resolved.len());
    for (product_id, quantity, product) in resolved {
        if !product.can_fulfil(quantity) {
            return Err(CoreError::InsufficientStock {
                product_id,
                product_name: product.name.clone(),
                available: product.stock_quantity,
                requested: quantity,
            });
        }

        demand.push(StockDemand {
            product_id,
            product_name: product.name.clone(),
            available: product.stock_quantity,
            quantity,
        });
    }

    let mut lines = Vec::with_capacity(request.items.len());
    for line in &request.items {
        let product = by_id
            .get(line.product_id.as_str())
            .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;
        lines.push(SaleItem {
            product_id: line.product_id.clone(),
            quantity: line.quantity,
            price_at_sale: product.price,
        });
    }

    let total_amount = sale_total(&lines)?;

    Ok(PricedSale {
        lines,
        demand,
        total_amount,
    })
}

/// `round2(Σ quantity × price_at_sale)`, exact until the single rounding.
pub fn sale_total(lines: &[SaleItem]) -> CoreResult<Money> {
    let overflow = || CoreError::AmountOverflow {
        context: "sale total".to_string(),
    };

    let amounts = lines
        .iter()
        .map(|line| line.line_amount().ok_or_else(overflow))
        .collect::<CoreResult<Vec<Money>>>()?;

    Money::checked_sum(amounts)
        .map(|sum| sum.round_to_cents())
        .ok_or_else(overflow)
}

// =============================================================================
// Unit Tests
// =============================================================================
