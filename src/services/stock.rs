//! Stock levels and inventory field validation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{ApiError, ApiResult};

pub const MAX_SKU_LEN: usize = 64;

/// Largest value a `NUMERIC(12, 2)` money column holds: 9999999999.99
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockLevel {
    OutOfStock,
    Low,
    InStock,
}

impl StockLevel {
    pub fn classify(quantity: i32, reorder_level: i32) -> Self {
        if quantity <= 0 {
            StockLevel::OutOfStock
        } else if quantity <= reorder_level {
            StockLevel::Low
        } else {
            StockLevel::InStock
        }
    }

    /// Low or empty, i.e. needs restocking
    pub fn needs_reorder(&self) -> bool {
        !matches!(self, StockLevel::InStock)
    }
}

/// Query-string filter for inventory listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockFilter {
    Low,
    Out,
    In,
}

impl FromStr for StockFilter {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(StockFilter::Low),
            "out" => Ok(StockFilter::Out),
            "in" => Ok(StockFilter::In),
            other => Err(ApiError::BadRequest(format!(
                "Unknown stock filter '{}', expected low, out or in",
                other
            ))),
        }
    }
}

impl StockFilter {
    pub fn matches(&self, level: StockLevel) -> bool {
        match self {
            // low includes empty shelves, matching the reorder view
            StockFilter::Low => level.needs_reorder(),
            StockFilter::Out => level == StockLevel::OutOfStock,
            StockFilter::In => level == StockLevel::InStock,
        }
    }
}

/// True when a stock change moves an item from healthy into reorder territory
pub fn crossed_into_low(before: i32, after: i32, reorder_level: i32) -> bool {
    !StockLevel::classify(before, reorder_level).needs_reorder()
        && StockLevel::classify(after, reorder_level).needs_reorder()
}

/// Trims and uppercases a SKU, rejecting anything outside `[A-Za-z0-9-_]`
pub fn normalize_sku(raw: &str) -> ApiResult<String> {
    let sku = raw.trim();
    if sku.is_empty() || sku.len() > MAX_SKU_LEN {
        return Err(ApiError::Validation(format!(
            "SKU must be between 1 and {} characters",
            MAX_SKU_LEN
        )));
    }
    if !sku
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ApiError::Validation(
            "SKU may only contain letters, digits, '-' and '_'".to_string(),
        ));
    }
    Ok(sku.to_ascii_uppercase())
}

pub fn require_name(field: &str, value: &str) -> ApiResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::Validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

pub fn validate_price(field: &str, value: Decimal) -> ApiResult<Decimal> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ApiError::Validation(format!("{} cannot be negative", field)));
    }
    let value = value.round_dp(2);
    if value > MAX_AMOUNT {
        return Err(ApiError::Validation(format!(
            "{} cannot exceed {}",
            field, MAX_AMOUNT
        )));
    }
    Ok(value)
}

pub fn validate_count(field: &str, value: i32) -> ApiResult<i32> {
    if value < 0 {
        return Err(ApiError::Validation(format!("{} cannot be negative", field)));
    }
    Ok(value)
}

/// Empty strings become `None`
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn classify_levels() {
        assert_eq!(StockLevel::classify(0, 5), StockLevel::OutOfStock);
        assert_eq!(StockLevel::classify(5, 5), StockLevel::Low);
        assert_eq!(StockLevel::classify(6, 5), StockLevel::InStock);
        assert_eq!(StockLevel::classify(1, 0), StockLevel::InStock);
    }

    #[test]
    fn crossing_detection() {
        assert!(crossed_into_low(10, 5, 5));
        assert!(crossed_into_low(6, 0, 5));
        assert!(!crossed_into_low(5, 3, 5), "already low before the change");
        assert!(!crossed_into_low(3, 10, 5), "restock is not a crossing");
    }

    #[test]
    fn stock_filters() {
        assert!(StockFilter::Low.matches(StockLevel::OutOfStock));
        assert!(StockFilter::Low.matches(StockLevel::Low));
        assert!(!StockFilter::Out.matches(StockLevel::Low));
        assert!(StockFilter::In.matches(StockLevel::InStock));
        assert!("sideways".parse::<StockFilter>().is_err());
        assert_eq!("OUT".parse::<StockFilter>().unwrap(), StockFilter::Out);
    }

    #[test]
    fn sku_normalization() {
        assert_eq!(normalize_sku("  gb-xmas_01 ").unwrap(), "GB-XMAS_01");
        assert!(normalize_sku("").is_err());
        assert!(normalize_sku("has space").is_err());
        assert!(normalize_sku(&"A".repeat(65)).is_err());
    }

    #[test]
    fn price_and_count_validation() {
        assert_eq!(
            validate_price("unit_price", Decimal::new(12999, 3)).unwrap(),
            Decimal::new(1300, 2)
        );
        assert!(validate_price("unit_price", Decimal::new(-1, 2)).is_err());
        assert!(validate_price("unit_price", Decimal::ZERO).is_ok());
        assert_eq!(MAX_AMOUNT, Decimal::new(999_999_999_999, 2));
        assert_eq!(validate_price("unit_price", MAX_AMOUNT).unwrap(), MAX_AMOUNT);
        assert!(matches!(
            validate_price("unit_price", Decimal::new(9_999_999_999_900, 2)),
            Err(ApiError::Validation(_))
        ));
        assert!(validate_count("quantity", -1).is_err());
        assert_eq!(validate_count("quantity", 0).unwrap(), 0);
    }

    #[test]
    fn optional_text_drops_blanks() {
        assert_eq!(optional_text(Some("  ".into())), None);
        assert_eq!(optional_text(Some(" Ribbons ".into())), Some("Ribbons".into()));
        assert_eq!(optional_text(None), None);
    }
}
