// --- Request and response payloads for the REST API ---
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::models::Role;
use crate::error::{ApiError, ApiResult};
use crate::services::order_workflow::OrderStatus;
use crate::services::stock::{
    StockFilter, normalize_sku, optional_text, require_name, validate_count, validate_price,
};

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 200;

/// Clamps a requested page size into `1..=MAX_PAGE_SIZE`
pub fn page_size(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

fn validate_email(field: &str, value: &str) -> ApiResult<String> {
    let email = value.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    };
    if !valid {
        return Err(ApiError::Validation(format!("{} must be a valid email address", field)));
    }
    Ok(email)
}

fn optional_email(value: Option<String>) -> ApiResult<Option<String>> {
    optional_text(value)
        .map(|email| validate_email("email", &email))
        .transpose()
}

// --- Accounts ---

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: String,
    pub role: Role,
}

impl CreateAccountRequest {
    /// Normalized email and trimmed name
    pub fn validate(&self) -> ApiResult<(String, String)> {
        let email = validate_email("email", &self.email)?;
        crate::auth::password::validate_password_strength(&self.password)?;
        Ok((email, self.full_name.trim().to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateAccountRequest {
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl UpdateAccountRequest {
    /// Admins may not lock themselves out
    pub fn check_self_update(&self, acting_user: Uuid, target: Uuid) -> ApiResult<()> {
        if acting_user != target {
            return Ok(());
        }
        if matches!(self.role, Some(Role::Staff)) {
            return Err(ApiError::BadRequest("You cannot remove your own admin role".to_string()));
        }
        if self.is_active == Some(false) {
            return Err(ApiError::BadRequest("You cannot deactivate your own account".to_string()));
        }
        Ok(())
    }
}

// --- Inventory ---

#[derive(Debug, Default, Deserialize)]
pub struct InventoryQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub stock: Option<String>,
}

impl InventoryQuery {
    pub fn stock_filter(&self) -> ApiResult<Option<StockFilter>> {
        optional_text(self.stock.clone())
            .map(|s| s.parse())
            .transpose()
    }

    /// `%term%` pattern for ILIKE, or None
    pub fn search_pattern(&self) -> Option<String> {
        optional_text(self.search.clone()).map(|term| format!("%{}%", escape_like(&term)))
    }
}

/// Escapes LIKE wildcards so user input matches literally
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub unit_price: Decimal,
    #[serde(default)]
    pub cost_price: Decimal,
    #[serde(default)]
    pub quantity: i32,
    #[serde(default)]
    pub reorder_level: i32,
    pub supplier_id: Option<Uuid>,
}

/// Validated inventory item ready for insert
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub unit_price: Decimal,
    pub cost_price: Decimal,
    pub quantity: i32,
    pub reorder_level: i32,
    pub supplier_id: Option<Uuid>,
}

impl CreateItemRequest {
    pub fn validate(self) -> ApiResult<NewItem> {
        Ok(NewItem {
            sku: normalize_sku(&self.sku)?,
            name: require_name("name", &self.name)?,
            description: optional_text(self.description),
            category: optional_text(self.category),
            unit_price: validate_price("unit_price", self.unit_price)?,
            cost_price: validate_price("cost_price", self.cost_price)?,
            quantity: validate_count("quantity", self.quantity)?,
            reorder_level: validate_count("reorder_level", self.reorder_level)?,
            supplier_id: self.supplier_id,
        })
    }
}

/// Partial update; stock changes go through the adjust endpoint
#[derive(Debug, Default, Deserialize)]
pub struct UpdateItemRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub unit_price: Option<Decimal>,
    pub cost_price: Option<Decimal>,
    pub reorder_level: Option<i32>,
    pub supplier_id: Option<Uuid>,
    #[serde(default)]
    pub clear_supplier: bool,
}

impl UpdateItemRequest {
    pub fn validate(self) -> ApiResult<Self> {
        if self.clear_supplier && self.supplier_id.is_some() {
            return Err(ApiError::Validation(
                "supplier_id and clear_supplier cannot be combined".to_string(),
            ));
        }
        Ok(Self {
            name: self.name.as_deref().map(|n| require_name("name", n)).transpose()?,
            description: self.description.map(|d| d.trim().to_string()),
            category: self.category.map(|c| c.trim().to_string()),
            unit_price: self
                .unit_price
                .map(|p| validate_price("unit_price", p))
                .transpose()?,
            cost_price: self
                .cost_price
                .map(|p| validate_price("cost_price", p))
                .transpose()?,
            reorder_level: self
                .reorder_level
                .map(|r| validate_count("reorder_level", r))
                .transpose()?,
            supplier_id: self.supplier_id,
            clear_supplier: self.clear_supplier,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    pub delta: i32,
    pub reason: Option<String>,
}

impl AdjustStockRequest {
    pub fn validate(&self) -> ApiResult<()> {
        if self.delta == 0 {
            return Err(ApiError::Validation("delta must not be zero".to_string()));
        }
        Ok(())
    }
}

// --- Suppliers ---

#[derive(Debug, Deserialize)]
pub struct SupplierRequest {
    pub name: String,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl SupplierRequest {
    pub fn validate(self) -> ApiResult<Self> {
        Ok(Self {
            name: require_name("name", &self.name)?,
            contact_person: optional_text(self.contact_person),
            email: optional_email(self.email)?,
            phone: optional_text(self.phone),
            address: optional_text(self.address),
        })
    }
}

// --- Customers ---

#[derive(Debug, Default, Deserialize)]
pub struct CustomerQuery {
    pub search: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerRequest {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl CustomerRequest {
    pub fn validate(self) -> ApiResult<Self> {
        Ok(Self {
            name: require_name("name", &self.name)?,
            email: optional_email(self.email)?,
            phone: optional_text(self.phone),
            address: optional_text(self.address),
        })
    }
}

// --- Orders ---

#[derive(Debug, Clone, Deserialize)]
pub struct OrderItemRequest {
    pub sku: String,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub customer_id: Option<Uuid>,
    pub customer: Option<CustomerRequest>,
    pub items: Vec<OrderItemRequest>,
    pub shipping_address: Option<String>,
    pub notes: Option<String>,
}

/// Who the order is for
#[derive(Debug, Clone)]
pub enum CheckoutCustomer {
    Existing(Uuid),
    New(CustomerRequest),
}

impl CheckoutRequest {
    pub fn customer(&self) -> ApiResult<CheckoutCustomer> {
        match (&self.customer_id, &self.customer) {
            (Some(id), None) => Ok(CheckoutCustomer::Existing(*id)),
            (None, Some(customer)) => Ok(CheckoutCustomer::New(customer.clone().validate()?)),
            (Some(_), Some(_)) => Err(ApiError::Validation(
                "Provide either customer_id or customer, not both".to_string(),
            )),
            (None, None) => Err(ApiError::Validation(
                "A customer_id or new customer is required".to_string(),
            )),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub status: Option<String>,
    pub customer_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl OrderQuery {
    pub fn status_filter(&self) -> ApiResult<Option<OrderStatus>> {
        optional_text(self.status.clone())
            .map(|s| s.parse().map_err(|e: crate::services::order_workflow::ParseStatusError| {
                ApiError::BadRequest(e.to_string())
            }))
            .transpose()
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct DateRangeQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StatusChangeResponse {
    Active { order: crate::database::models::OrderDetail },
    Archived { order: crate::database::models::ArchivedOrder },
}

// --- Reports ---

#[derive(Debug, Default, Deserialize)]
pub struct SalesReportQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub granularity: Option<String>,
}

// --- Notifications ---

#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct UpdatedResponse {
    pub updated: u64,
}
