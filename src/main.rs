//! # Wrap-N-Track
//!
//! Back office API for a gift-box shop: inventory, suppliers, customers,
//! order fulfilment, sales reporting and in-app notifications. Built on
//! Axum and Tokio with PostgreSQL through deadpool.
//!
//! ## Architecture
//! - `server`: router assembly, middleware and start-up
//! - `config`: environment variable configuration
//! - `auth`: JWT sessions, password hashing and role checks
//! - `database`: pooled PostgreSQL access and migrations
//! - `services`: checkout planning, order workflow, stock rules, reports
//!   and notifications
//! - `routes`: HTTP handlers grouped by API area
//!
//! ## Environment Setup
//! ```bash
//! cp .env.example .env
//! # Set DATABASE_URL and JWT_SECRET
//! ```
//!
//! ## Health Check
//! ```bash
//! curl http://localhost:3000/health
//! ```

mod auth;
mod config;
mod database;
mod error;
mod routes;
mod server;
mod services;
mod state_structs;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; real deployments set the environment directly
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .compact(),
        )
        .init();

    tracing::info!("Starting Wrap-N-Track...");
    tracing::info!("Package: {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Build profile: {}",
        if cfg!(debug_assertions) { "debug" } else { "release" }
    );

    let config = config::Config::from_env()?;
    server::start(config).await
}
