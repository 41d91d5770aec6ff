//! Database module - PostgreSQL connection and startup outcome

use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::error::{AppError, AppResult};

/// Outcome of reaching the database at startup.
///
/// A missing or unreachable database must not prevent the process from
/// starting; the service runs degraded instead and every data-dependent
/// handler checks this before touching the pool.
#[derive(Debug, Clone)]
pub enum Backend {
    Connected(PgPool),
    Degraded(String),
}

impl Backend {
    /// The pool handle, or `Unavailable` when the service started degraded.
    pub fn pool(&self) -> AppResult<&PgPool> {
        match self {
            Backend::Connected(pool) => Ok(pool),
            Backend::Degraded(_) => Err(AppError::Unavailable),
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Backend::Connected(_))
    }
}

/// Connect to PostgreSQL and apply the schema, folding any failure into
/// `Backend::Degraded`.
pub async fn connect(database_url: Option<&str>) -> Backend {
    let Some(url) = database_url else {
        return Backend::Degraded("DATABASE_URL not set".to_string());
    };

    let pool = match create_pool(url).await {
        Ok(pool) => pool,
        Err(err) => return Backend::Degraded(err.to_string()),
    };

    match run_migrations(&pool).await {
        Ok(()) => Backend::Connected(pool),
        Err(err) => Backend::Degraded(err.to_string()),
    }
}

/// Create database connection pool
async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

/// Run database migrations
async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // raw_sql: the script is multi-statement
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;

    tracing::info!("Database schema applied successfully");
    Ok(())
}

/// Database schema SQL
const SCHEMA_SQL: &str = r#"
-- Log records: normalized timestamp in its own column, the rest of the
-- record kept verbatim as a schemaless document
CREATE TABLE IF NOT EXISTS logs (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    recorded_at TIMESTAMPTZ,
    doc JSONB NOT NULL
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_logs_recorded ON logs(recorded_at DESC);
CREATE INDEX IF NOT EXISTS idx_logs_doc ON logs USING GIN (doc);
"#;
