// # Routes Module
//
// HTTP handlers grouped by API area. Each submodule exposes a
// `create_routes()` router that `server.rs` mounts behind the right
// middleware.

/// Liveness and readiness endpoints
pub mod health;

/// Login, logout and the current session
pub mod auth;

/// Admin-only account management
pub mod accounts;

/// `Json`, `Path` and `Query` with JSON error bodies
pub mod extractors;

pub mod customers;
pub mod inventory;
pub mod notifications;
pub mod orders;
pub mod reports;
pub mod suppliers;
