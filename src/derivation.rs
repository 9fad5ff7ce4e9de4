//! Presentation fields derived from a raw product record.
//!
//! Everything here is pure apart from the parse-fallback signal: a malformed
//! sale percentage is logged and counted, then treated as "no discount".

use crate::metrics::METRICS;
use crate::model::{Rating, RawProduct, StockStatus};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_LOW_STOCK_THRESHOLD: u32 = 10;
pub const DEFAULT_MINOR_UNIT_DIGITS: u32 = 0;
pub const MAX_REVIEW_SCORE: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockThresholds {
    /// Quantities from 1 up to and including this value are "low stock".
    pub low_stock: u32,
}

impl Default for StockThresholds {
    fn default() -> Self {
        Self {
            low_stock: DEFAULT_LOW_STOCK_THRESHOLD,
        }
    }
}

/// Constants applied when a snapshot is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivationPolicy {
    /// Decimal places of the currency's minor unit (0 for IDR, 2 for EUR).
    pub minor_unit_digits: u32,
    pub stock: StockThresholds,
}

impl Default for DerivationPolicy {
    fn default() -> Self {
        Self {
            minor_unit_digits: DEFAULT_MINOR_UNIT_DIGITS,
            stock: StockThresholds::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("sale percentage {raw:?} is not a number between 0 and 100")]
pub struct DiscountParseError {
    pub raw: String,
}

/// Parse the string-encoded sale percentage.
///
/// Absent or blank values mean no sale. A trailing `%` is tolerated.
pub fn parse_sale_percentage(raw: Option<&str>) -> Result<f64, DiscountParseError> {
    let Some(raw) = raw else {
        return Ok(0.0);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }

    let numeric = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    match numeric.parse::<f64>() {
        Ok(value) if value.is_finite() && (0.0..=100.0).contains(&value) => Ok(value),
        _ => Err(DiscountParseError {
            raw: raw.to_string(),
        }),
    }
}

/// Sale percentage of a product, with malformed input reported and replaced
/// by zero.
pub fn effective_sale_percentage(product: &RawProduct) -> f64 {
    match parse_sale_percentage(product.sale_percentage.as_deref()) {
        Ok(value) => value,
        Err(error) => {
            METRICS.record_discount_parse_fallback();
            warn!(
                product_id = %product.id,
                raw = %error.raw,
                fallback = "selling_price",
                "discount parse fallback"
            );
            0.0
        }
    }
}

pub fn round_to_minor_unit(amount: f64, minor_unit_digits: u32) -> f64 {
    let factor = 10f64.powi(minor_unit_digits as i32);
    (amount * factor).round() / factor
}

/// Price after the sale percentage, rounded to the currency's minor unit and
/// never above the selling price.
pub fn discounted_price(product: &RawProduct, policy: &DerivationPolicy) -> f64 {
    let percentage = effective_sale_percentage(product);
    apply_discount(product.selling_price, percentage, policy.minor_unit_digits)
}

pub(crate) fn apply_discount(selling_price: f64, percentage: f64, minor_unit_digits: u32) -> f64 {
    if percentage <= 0.0 {
        return selling_price;
    }
    let discounted = selling_price * (100.0 - percentage) / 100.0;
    round_to_minor_unit(discounted, minor_unit_digits)
        .max(0.0)
        .min(selling_price)
}

/// Mean review score, or [`Rating::Unrated`] when nobody has reviewed yet.
pub fn average_rating(product: &RawProduct) -> Rating {
    let scores = product
        .reviews
        .iter()
        .map(|review| review.rating)
        .filter(|score| score.is_finite())
        .map(|score| score.clamp(0.0, MAX_REVIEW_SCORE));

    let (sum, count) = scores.fold((0.0, 0usize), |(sum, count), score| (sum + score, count + 1));
    if count == 0 {
        Rating::Unrated
    } else {
        Rating::Stars(sum / count as f64)
    }
}

pub fn stock_status(product: &RawProduct, thresholds: &StockThresholds) -> StockStatus {
    match product.stock.unwrap_or(0) {
        0 => StockStatus::OutOfStock,
        quantity if quantity <= thresholds.low_stock => StockStatus::LowStock,
        _ => StockStatus::InStock,
    }
}
