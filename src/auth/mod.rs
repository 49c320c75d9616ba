//! # Authentication Module
//!
//! Handles password hashing, JWT issuance and validation, and the middleware
//! that secures the API. Two roles exist: admins manage accounts and
//! destructive operations, staff run day-to-day inventory and orders.

pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;

pub use jwt::JwtService;
pub use middleware::AuthMiddleware;
pub use models::AuthUser;
