//! # Reports
//!
//! Read-model types and period math for the two operational reports.
//!
//! ```text
//! Low stock:      stock_quantity < min_stock_level, lowest stock first
//! Sales summary:  sales in [start, end-of-day(end)], grouped by product,
//!                 highest revenue first
//! ```

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::validation::ValidationResult;

// =============================================================================
// Low Stock
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LowStockEntry {
    pub product_id: String,
    pub name: String,
    pub sku: String,
    pub stock_quantity: i64,
    pub min_stock_level: i64,
    pub supplier_name: String,
    pub supplier_phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LowStockReport {
    #[ts(as = "String")]
    pub report_date: DateTime<Utc>,
    pub products: Vec<LowStockEntry>,
    pub count: usize,
}

impl LowStockReport {
    pub fn new(report_date: DateTime<Utc>, products: Vec<LowStockEntry>) -> Self {
        LowStockReport {
            report_date,
            count: products.len(),
            products,
        }
    }
}

// =============================================================================
// Sales Summary
// =============================================================================

/// Inclusive reporting window. `end` is always the last millisecond of the
/// requested end day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SalesPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SalesPeriod {
    /// Parses `startDate`/`endDate` query values.
    ///
    /// Both accept `YYYY-MM-DD` or RFC 3339. A start date alone means
    /// midnight UTC. The end is widened to 23:59:59.999 of its UTC day.
    ///
    /// ## Example
    /// ```rust
    /// use stockroom_core::report::SalesPeriod;
    ///
    /// let period = SalesPeriod::parse(Some("2024-03-01"), Some("2024-03-31")).unwrap();
    /// assert_eq!(period.end.to_rfc3339(), "2024-03-31T23:59:59.999+00:00");
    /// ```
    pub fn parse(start: Option<&str>, end: Option<&str>) -> ValidationResult<SalesPeriod> {
        let start = required("startDate", start)?;
        let end = required("endDate", end)?;

        let start = parse_instant("startDate", start)?;
        let end_day = parse_instant("endDate", end)?.date_naive();

        SalesPeriod::new(start, end_day)
    }

    pub fn new(start: DateTime<Utc>, end_day: NaiveDate) -> ValidationResult<SalesPeriod> {
        let end_of_day = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).ok_or_else(|| {
            ValidationError::InvalidFormat {
                field: "endDate".to_string(),
                reason: "cannot be extended to end of day".to_string(),
            }
        })?;
        let end = Utc.from_utc_datetime(&end_day.and_time(end_of_day));

        if start > end {
            return Err(ValidationError::InvalidFormat {
                field: "startDate".to_string(),
                reason: "must not be after endDate".to_string(),
            });
        }

        Ok(SalesPeriod { start, end })
    }

    #[inline]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

fn required<'a>(field: &str, value: Option<&'a str>) -> ValidationResult<&'a str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ValidationError::Required {
            field: field.to_string(),
        })
}

fn parse_instant(field: &str, value: &str) -> ValidationResult<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&midnight));
        }
    }

    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must be YYYY-MM-DD or an RFC 3339 timestamp".to_string(),
        })
}

/// One product's sales within a period.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SalesSummaryRow {
    pub product_id: String,
    pub product_name: String,
    pub sku: String,
    pub total_quantity_sold: i64,
    /// `round2(Σ quantity × price_at_sale)`.
    #[ts(type = "number")]
    pub total_revenue: Money,
    /// Number of sale lines, not sales.
    pub count_sales: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SalesSummaryReport {
    #[ts(as = "String")]
    pub start_date: DateTime<Utc>,
    #[ts(as = "String")]
    pub end_date: DateTime<Utc>,
    pub summary: Vec<SalesSummaryRow>,
    pub total_items: usize,
}

impl SalesSummaryReport {
    pub fn new(period: SalesPeriod, summary: Vec<SalesSummaryRow>) -> Self {
        SalesSummaryReport {
            start_date: period.start,
            end_date: period.end,
            total_items: summary.len(),
            summary,
        }
    }
}
