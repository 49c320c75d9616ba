//! # Database Module
//!
//! PostgreSQL access through a deadpool connection pool. Each submodule adds
//! the queries for one area as methods on [`DatabaseConnection`].

pub mod connection;
pub mod customers;
pub mod inventory;
pub mod migrations;
pub mod models;
pub mod notifications;
pub mod orders;
pub mod reports;
pub mod suppliers;
pub mod users;

#[cfg(test)]
pub(crate) mod test_support;

pub use connection::{DatabaseConfig, DatabaseConnection};
