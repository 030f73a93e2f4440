//! Connection management for the relational message store.

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::StoreConfig;
use crate::store::error::StoreError;

/// A pooled connection to a Message DB-compatible Postgres schema.
///
/// Cloning a `StoreClient` is cheap; it shares the underlying [`PgPool`].
#[derive(Clone)]
pub struct StoreClient {
    pub(crate) pool: PgPool,
}

impl StoreClient {
    /// Open a connection pool against `config.database_url`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::FatalStoreError`] if the pool cannot be
    /// established (bad credentials, unreachable host, missing schema).
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await
            .map_err(|e| StoreError::FatalStoreError(format!("failed to connect: {}", e)))?;
        Ok(Self { pool })
    }

    /// Wrap an already-built [`PgPool`] without going through [`Self::connect`].
    ///
    /// Useful for sharing a pool with the rest of an application, or for
    /// pointing at a pool configured with options [`StoreConfig`] does not
    /// expose.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Close the underlying pool, waiting for in-flight queries to finish.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
