//! Checkout planning.
//!
//! Turns a cart into order lines against locked inventory rows. The
//! database layer runs this inside the checkout transaction and applies
//! the resulting stock changes.

use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::error::{ApiError, ApiResult};
use crate::services::stock::{MAX_AMOUNT, crossed_into_low, normalize_sku};
use crate::state_structs::OrderItemRequest;

/// Upper bound on distinct lines in one order
pub const MAX_ORDER_LINES: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestedLine {
    pub sku: String,
    pub quantity: i32,
}

/// Inventory row as seen under `SELECT ... FOR UPDATE`
#[derive(Debug, Clone)]
pub struct StockRow {
    pub sku: String,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub reorder_level: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedLine {
    pub sku: String,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StockChange {
    pub sku: String,
    pub name: String,
    pub before: i32,
    pub after: i32,
    pub reorder_level: i32,
}

impl StockChange {
    pub fn crossed_into_low(&self) -> bool {
        crossed_into_low(self.before, self.after, self.reorder_level)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutPlan {
    pub lines: Vec<PlannedLine>,
    pub total: Decimal,
    pub stock_changes: Vec<StockChange>,
}

impl CheckoutPlan {
    pub fn low_stock_crossings(&self) -> impl Iterator<Item = &StockChange> {
        self.stock_changes.iter().filter(|change| change.crossed_into_low())
    }
}

/// Validates cart lines, normalizes SKUs and merges duplicates. Order of
/// first appearance is kept.
pub fn merge_lines(items: &[OrderItemRequest]) -> ApiResult<Vec<RequestedLine>> {
    if items.is_empty() {
        return Err(ApiError::Validation("An order needs at least one item".to_string()));
    }

    let mut merged: Vec<RequestedLine> = Vec::with_capacity(items.len());
    for item in items {
        if item.quantity <= 0 {
            return Err(ApiError::Validation(format!(
                "Quantity for '{}' must be greater than zero",
                item.sku.trim()
            )));
        }
        let sku = normalize_sku(&item.sku)?;
        match merged.iter_mut().find(|line| line.sku == sku) {
            Some(line) => {
                line.quantity = line.quantity.checked_add(item.quantity).ok_or_else(|| {
                    ApiError::Validation(format!("Quantity for '{}' is too large", sku))
                })?;
            }
            None => merged.push(RequestedLine {
                sku,
                quantity: item.quantity,
            }),
        }
    }

    if merged.len() > MAX_ORDER_LINES {
        return Err(ApiError::Validation(format!(
            "An order may contain at most {} different items",
            MAX_ORDER_LINES
        )));
    }
    Ok(merged)
}

/// Prices the cart at current unit prices and computes stock changes.
/// Missing SKUs are 404, short stock is 409.
pub fn plan_checkout(
    requested: &[RequestedLine],
    stock: &HashMap<String, StockRow>,
) -> ApiResult<CheckoutPlan> {
    let mut lines = Vec::with_capacity(requested.len());
    let mut stock_changes = Vec::with_capacity(requested.len());
    let mut total = Decimal::ZERO;

    for line in requested {
        let row = stock
            .get(&line.sku)
            .ok_or_else(|| ApiError::not_found("Inventory item", &line.sku))?;

        if row.quantity < line.quantity {
            return Err(ApiError::Conflict(format!(
                "Insufficient stock for '{}': requested {}, available {}",
                row.sku, line.quantity, row.quantity
            )));
        }

        let line_total = row.unit_price * Decimal::from(line.quantity);
        total += line_total;

        lines.push(PlannedLine {
            sku: row.sku.clone(),
            name: row.name.clone(),
            quantity: line.quantity,
            unit_price: row.unit_price,
            line_total,
        });
        stock_changes.push(StockChange {
            sku: row.sku.clone(),
            name: row.name.clone(),
            before: row.quantity,
            after: row.quantity - line.quantity,
            reorder_level: row.reorder_level,
        });
    }

    let total = total.round_dp(2);
    if total > MAX_AMOUNT {
        return Err(ApiError::Validation(format!(
            "Order total {} exceeds the maximum of {}",
            total, MAX_AMOUNT
        )));
    }

    Ok(CheckoutPlan {
        lines,
        total,
        stock_changes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(sku: &str, quantity: i32) -> OrderItemRequest {
        OrderItemRequest {
            sku: sku.to_string(),
            quantity,
        }
    }

    fn stock_row(sku: &str, price: Decimal, quantity: i32, reorder_level: i32) -> StockRow {
        StockRow {
            sku: sku.to_string(),
            name: format!("Item {}", sku),
            unit_price: price,
            quantity,
            reorder_level,
        }
    }

    fn stock_map(rows: Vec<StockRow>) -> HashMap<String, StockRow> {
        rows.into_iter().map(|row| (row.sku.clone(), row)).collect()
    }

    #[test]
    fn duplicates_merge_case_insensitively() {
        let merged = merge_lines(&[item("box-a", 1), item("ribbon", 2), item("BOX-A", 3)]).unwrap();
        assert_eq!(
            merged,
            vec![
                RequestedLine { sku: "BOX-A".into(), quantity: 4 },
                RequestedLine { sku: "RIBBON".into(), quantity: 2 },
            ]
        );
    }

    #[test]
    fn empty_cart_and_bad_quantities_are_rejected() {
        assert!(matches!(merge_lines(&[]), Err(ApiError::Validation(_))));
        assert!(matches!(merge_lines(&[item("BOX-A", 0)]), Err(ApiError::Validation(_))));
        assert!(matches!(merge_lines(&[item("BOX-A", -2)]), Err(ApiError::Validation(_))));
        assert!(matches!(
            merge_lines(&[item("BOX-A", i32::MAX), item("box-a", 1)]),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn plan_prices_lines_and_reports_crossings() {
        let stock = stock_map(vec![
            stock_row("BOX-A", Decimal::new(1550, 2), 10, 3),
            stock_row("RIBBON", Decimal::new(250, 2), 4, 5),
        ]);
        let requested = vec![
            RequestedLine { sku: "BOX-A".into(), quantity: 8 },
            RequestedLine { sku: "RIBBON".into(), quantity: 1 },
        ];

        let plan = plan_checkout(&requested, &stock).unwrap();
        assert_eq!(plan.total, Decimal::new(12650, 2));
        assert_eq!(plan.lines[0].line_total, Decimal::new(12400, 2));
        assert_eq!(plan.stock_changes[0].after, 2);
        assert_eq!(plan.stock_changes[1].after, 3);

        // BOX-A goes 10 -> 2 with reorder level 3; RIBBON was already low
        let crossed: Vec<_> = plan.low_stock_crossings().map(|c| c.sku.as_str()).collect();
        assert_eq!(crossed, vec!["BOX-A"]);
    }

    #[test]
    fn insufficient_stock_is_a_conflict() {
        let stock = stock_map(vec![stock_row("BOX-A", Decimal::ONE, 2, 0)]);
        let requested = vec![RequestedLine { sku: "BOX-A".into(), quantity: 3 }];
        match plan_checkout(&requested, &stock) {
            Err(ApiError::Conflict(message)) => assert!(message.contains("BOX-A")),
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[test]
    fn unknown_sku_is_not_found() {
        let requested = vec![RequestedLine { sku: "GHOST".into(), quantity: 1 }];
        assert!(matches!(
            plan_checkout(&requested, &HashMap::new()),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn total_above_money_column_limit_is_rejected() {
        let stock = stock_map(vec![stock_row("BOX-A", MAX_AMOUNT, 5, 0)]);
        let requested = vec![RequestedLine { sku: "BOX-A".into(), quantity: 2 }];
        assert!(matches!(
            plan_checkout(&requested, &stock),
            Err(ApiError::Validation(_))
        ));

        let requested = vec![RequestedLine { sku: "BOX-A".into(), quantity: 1 }];
        assert_eq!(plan_checkout(&requested, &stock).unwrap().total, MAX_AMOUNT);
    }

    #[test]
    fn selling_out_exactly_is_allowed() {
        let stock = stock_map(vec![stock_row("BOX-A", Decimal::TEN, 2, 0)]);
        let requested = vec![RequestedLine { sku: "BOX-A".into(), quantity: 2 }];
        let plan = plan_checkout(&requested, &stock).unwrap();
        assert_eq!(plan.stock_changes[0].after, 0);
        assert!(plan.stock_changes[0].crossed_into_low());
    }
}
