//! Sales and inventory reporting.
//!
//! The database hands over flat sale lines; everything else (periods,
//! top products, CSV) is computed here.

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;
use uuid::Uuid;

use crate::database::models::InventoryItem;
use crate::error::ApiError;
use crate::services::order_workflow::OrderStatus;
use crate::services::stock::StockLevel;

pub const TOP_PRODUCTS: usize = 10;

/// One product line of a non-cancelled order
#[derive(Debug, Clone)]
pub struct SaleLine {
    pub order_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub sku: String,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl SaleLine {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Day,
    Week,
    Month,
}

impl FromStr for Granularity {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" | "daily" => Ok(Granularity::Day),
            "week" | "weekly" => Ok(Granularity::Week),
            "month" | "monthly" => Ok(Granularity::Month),
            other => Err(ApiError::BadRequest(format!(
                "Unknown granularity '{}', expected day, week or month",
                other
            ))),
        }
    }
}

impl Granularity {
    /// Start of the bucket containing `at`. Weeks start on Monday.
    pub fn period_start(&self, at: DateTime<Utc>) -> NaiveDate {
        let date = at.date_naive();
        match self {
            Granularity::Day => date,
            Granularity::Week => {
                date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
            }
            Granularity::Month => date.with_day(1).unwrap_or(date),
        }
    }
}

/// Inclusive reporting window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl ReportRange {
    /// Defaults to the last 30 days ending now
    pub fn resolve(
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Self, ApiError> {
        let to = to.unwrap_or(now);
        let from = from.unwrap_or(to - Duration::days(30));
        if from > to {
            return Err(ApiError::BadRequest(
                "'from' must not be later than 'to'".to_string(),
            ));
        }
        Ok(Self { from, to })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodSales {
    pub period_start: NaiveDate,
    pub revenue: Decimal,
    pub orders: usize,
    pub units: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductSales {
    pub sku: String,
    pub name: String,
    pub units: i64,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct SalesReport {
    pub range: ReportRange,
    pub granularity: Granularity,
    pub total_revenue: Decimal,
    pub order_count: usize,
    pub average_order_value: Decimal,
    pub units_sold: i64,
    pub periods: Vec<PeriodSales>,
    pub top_products: Vec<ProductSales>,
}

pub fn build_sales_report(
    lines: &[SaleLine],
    range: ReportRange,
    granularity: Granularity,
) -> SalesReport {
    let mut total_revenue = Decimal::ZERO;
    let mut units_sold: i64 = 0;
    let mut orders: HashSet<Uuid> = HashSet::new();
    let mut periods: BTreeMap<NaiveDate, (Decimal, HashSet<Uuid>, i64)> = BTreeMap::new();
    let mut products: HashMap<&str, ProductSales> = HashMap::new();

    for line in lines {
        let revenue = line.line_total();
        let units = i64::from(line.quantity);
        total_revenue += revenue;
        units_sold += units;
        orders.insert(line.order_id);

        let bucket = periods
            .entry(granularity.period_start(line.created_at))
            .or_insert_with(|| (Decimal::ZERO, HashSet::new(), 0));
        bucket.0 += revenue;
        bucket.1.insert(line.order_id);
        bucket.2 += units;

        let product = products
            .entry(line.sku.as_str())
            .or_insert_with(|| ProductSales {
                sku: line.sku.clone(),
                name: line.name.clone(),
                units: 0,
                revenue: Decimal::ZERO,
            });
        product.units += units;
        product.revenue += revenue;
    }

    let mut top_products: Vec<ProductSales> = products.into_values().collect();
    top_products.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.sku.cmp(&b.sku)));
    top_products.truncate(TOP_PRODUCTS);

    let order_count = orders.len();
    let average_order_value = if order_count == 0 {
        Decimal::ZERO
    } else {
        (total_revenue / Decimal::from(order_count)).round_dp(2)
    };

    SalesReport {
        range,
        granularity,
        total_revenue: total_revenue.round_dp(2),
        order_count,
        average_order_value,
        units_sold,
        periods: periods
            .into_iter()
            .map(|(period_start, (revenue, orders, units))| PeriodSales {
                period_start,
                revenue: revenue.round_dp(2),
                orders: orders.len(),
                units,
            })
            .collect(),
        top_products,
    }
}

#[derive(Debug, Clone, Serialize)]
struct SaleCsvRow<'a> {
    order_id: Uuid,
    created_at: String,
    status: &'a str,
    sku: &'a str,
    name: &'a str,
    quantity: i32,
    unit_price: Decimal,
    line_total: Decimal,
}

/// One CSV row per sale line, with a header row
pub fn sales_csv(lines: &[SaleLine]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for line in lines {
        writer
            .serialize(SaleCsvRow {
                order_id: line.order_id,
                created_at: line.created_at.to_rfc3339(),
                status: line.status.as_str(),
                sku: &line.sku,
                name: &line.name,
                quantity: line.quantity,
                unit_price: line.unit_price,
                line_total: line.line_total(),
            })
            .context("Failed to write CSV row")?;
    }
    if lines.is_empty() {
        writer
            .write_record([
                "order_id", "created_at", "status", "sku", "name", "quantity", "unit_price",
                "line_total",
            ])
            .context("Failed to write CSV header")?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV: {}", e))?;
    String::from_utf8(bytes).context("CSV output was not UTF-8")
}

#[derive(Debug, Clone, Serialize)]
pub struct StockAlert {
    pub sku: String,
    pub name: String,
    pub quantity: i32,
    pub reorder_level: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct InventoryReport {
    pub item_count: usize,
    pub total_units: i64,
    pub value_at_cost: Decimal,
    pub value_at_retail: Decimal,
    pub low_stock: Vec<StockAlert>,
    pub out_of_stock: Vec<StockAlert>,
}

pub fn build_inventory_report(items: &[InventoryItem]) -> InventoryReport {
    let mut report = InventoryReport {
        item_count: items.len(),
        total_units: 0,
        value_at_cost: Decimal::ZERO,
        value_at_retail: Decimal::ZERO,
        low_stock: Vec::new(),
        out_of_stock: Vec::new(),
    };

    for item in items {
        let units = Decimal::from(item.quantity);
        report.total_units += i64::from(item.quantity);
        report.value_at_cost += item.cost_price * units;
        report.value_at_retail += item.unit_price * units;

        let alert = || StockAlert {
            sku: item.sku.clone(),
            name: item.name.clone(),
            quantity: item.quantity,
            reorder_level: item.reorder_level,
        };
        match item.stock_level {
            StockLevel::OutOfStock => report.out_of_stock.push(alert()),
            StockLevel::Low => report.low_stock.push(alert()),
            StockLevel::InStock => {}
        }
    }

    report.value_at_cost = report.value_at_cost.round_dp(2);
    report.value_at_retail = report.value_at_retail.round_dp(2);
    report
}
