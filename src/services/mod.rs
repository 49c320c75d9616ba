//! # Services Module
//!
//! Business rules that sit between the routes and the database: checkout
//! planning, the order workflow, stock rules, reporting and notifications.

pub mod checkout;
pub mod notifier;
pub mod order_workflow;
pub mod reports;
pub mod stock;
pub mod stock_monitor;
