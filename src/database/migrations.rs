//! Database Migrations
//!
//! SQL migrations under `migrations/` are embedded at compile time and
//! applied with refinery on start-up.

use anyhow::{Context, Result};

use crate::database::DatabaseConnection;

mod embedded {
    refinery::embed_migrations!("migrations");
}

/// Run all pending migrations
pub async fn run_migrations(db: &DatabaseConnection) -> Result<()> {
    tracing::info!("Running database migrations...");

    let mut client = db
        .pool()
        .get()
        .await
        .context("Failed to get connection for migrations")?;

    let report = embedded::migrations::runner()
        .run_async(&mut **client)
        .await
        .context("Failed to apply migrations")?;

    for migration in report.applied_migrations() {
        tracing::info!("Applied migration {}", migration);
    }
    tracing::info!(
        "Database migrations completed ({} applied)",
        report.applied_migrations().len()
    );
    Ok(())
}
