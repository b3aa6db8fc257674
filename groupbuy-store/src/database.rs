use async_trait::async_trait;
use chrono::{DateTime, Utc};
use groupbuy_core::{OfferStore, StoreError, StoreResult};
use groupbuy_shared::{OfferDocument, OfferPatch};
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, Pool, Postgres};
use std::time::Duration;
use tracing::info;

use crate::app_config::DatabaseConfig;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(config.password.expose())
            .database(&config.name);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_with(options)
            .await
            .map_err(map_sqlx_error)?;

        info!("Connected to {}:{}/{}", config.host, config.port, config.name);
        Ok(Self { pool })
    }
}

/// Offer collections stored as Postgres tables of JSONB documents:
/// `(id TEXT PRIMARY KEY, data JSONB NOT NULL, updated_at TIMESTAMPTZ)`.
pub struct PostgresOfferStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: String,
    data: Value,
    updated_at: Option<DateTime<Utc>>,
}

impl From<DocumentRow> for OfferDocument {
    fn from(row: DocumentRow) -> Self {
        let mut doc = OfferDocument::from_json(row.id, row.data);
        doc.updated_at = row.updated_at;
        doc
    }
}

impl PostgresOfferStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl From<DbClient> for PostgresOfferStore {
    fn from(client: DbClient) -> Self {
        Self::new(client.pool)
    }
}

#[async_trait]
impl OfferStore for PostgresOfferStore {
    async fn fetch_page(
        &self,
        collection: &str,
        after: Option<&str>,
        limit: usize,
    ) -> StoreResult<Vec<OfferDocument>> {
        let table = quoted_table(collection)?;
        let sql = format!(
            "SELECT id, data, updated_at FROM {} WHERE ($1::text IS NULL OR id > $1) ORDER BY id LIMIT $2",
            table
        );

        let rows: Vec<DocumentRow> = sqlx::query_as(&sql)
            .bind(after)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(OfferDocument::from).collect())
    }

    async fn update(&self, collection: &str, id: &str, patch: &OfferPatch) -> StoreResult<()> {
        let table = quoted_table(collection)?;
        // `||` on JSONB merges top-level keys, leaving the rest of the document untouched.
        // `updatedAt` in the document and the `updated_at` column get the same time.
        let sql = format!(
            "UPDATE {} SET data = data || $2, updated_at = $3 WHERE id = $1",
            table
        );
        let now = Utc::now();

        let result = sqlx::query(&sql)
            .bind(id)
            .bind(Value::Object(patch.stamped_fields(now)))
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

/// Collection names become table identifiers, so only plain identifiers are accepted.
fn quoted_table(collection: &str) -> StoreResult<String> {
    let mut chars = collection.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if !valid_start || !valid_rest || collection.len() > 63 {
        return Err(StoreError::InvalidCollection(collection.to_string()));
    }
    Ok(format!("\"{}\"", collection))
}

fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => StoreError::Unavailable(err.to_string()),
        _ => StoreError::Backend(err.to_string()),
    }
}
