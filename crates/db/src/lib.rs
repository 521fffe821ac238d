pub mod github;
pub mod identity;
pub mod integration;
pub mod jira;
pub mod links;

use praxis_common::error::{PraxisError, PraxisResult};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Create a Postgres connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> PraxisResult<PgPool> {
    tracing::info!("connecting to database");
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .map_err(|e| PraxisError::Database(e.to_string()))
}
