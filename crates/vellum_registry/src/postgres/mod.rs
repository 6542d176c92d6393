//! PostgreSQL registry backend.
//!
//! Diesel queries run on a bounded blocking pool over an r2d2 connection
//! pool. The `UNIQUE (fingerprint)` constraint arbitrates the dedup race and
//! `ON DELETE RESTRICT` on `media_usages.media_id` keeps a row that gained a
//! usage in another process from being hard-deleted.

mod media;
mod models;
mod schema;
mod usage;

use crate::MediaLocks;
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{info, instrument};
use vellum_core::WorkerPool;
use vellum_error::{DatabaseError, DatabaseErrorKind, VellumError, VellumResult};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Default number of pooled connections.
const DEFAULT_POOL_SIZE: u32 = 10;

/// PostgreSQL implementation of [`MediaRegistry`](crate::MediaRegistry) and
/// [`UsageTracker`](crate::UsageTracker).
///
/// # Example
///
/// ```no_run
/// use vellum_registry::PostgresRegistry;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// // Requires DATABASE_URL=postgresql://localhost/vellum in environment
/// let registry = PostgresRegistry::new()?;
/// registry.run_migrations().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PostgresRegistry {
    pool: Pool<ConnectionManager<PgConnection>>,
    blocking: WorkerPool,
    locks: MediaLocks,
}

impl std::fmt::Debug for PostgresRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresRegistry")
            .field("pool_size", &self.pool.max_size())
            .finish_non_exhaustive()
    }
}

impl PostgresRegistry {
    /// Connect using the `DATABASE_URL` environment variable.
    ///
    /// # Errors
    ///
    /// Returns a `Connection` error if the variable is unset, or a `Pool`
    /// error if no connection can be established.
    pub fn new() -> VellumResult<Self> {
        let database_url = std::env::var("DATABASE_URL").map_err(|_| {
            DatabaseError::new(DatabaseErrorKind::Connection(
                "DATABASE_URL environment variable not set".to_string(),
            ))
        })?;
        Self::connect(&database_url, DEFAULT_POOL_SIZE)
    }

    /// Connect to `database_url` with at most `pool_size` connections.
    ///
    /// # Errors
    ///
    /// Returns a `Pool` error if the pool cannot be built or warmed up.
    #[instrument(skip(database_url))]
    pub fn connect(database_url: &str, pool_size: u32) -> VellumResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(database_url);
        let pool = Pool::builder()
            .max_size(pool_size.max(1))
            .build(manager)
            .map_err(|e| {
                DatabaseError::new(DatabaseErrorKind::Pool(format!(
                    "Failed to create connection pool: {}",
                    e
                )))
            })?;

        info!(pool_size, "Connected media registry to PostgreSQL");
        Ok(Self {
            blocking: WorkerPool::new("registry", pool.max_size() as usize),
            pool,
            locks: MediaLocks::new(),
        })
    }

    /// Apply any pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns a `Migration` error if a migration fails.
    pub async fn run_migrations(&self) -> VellumResult<()> {
        self.with_conn(|conn| {
            let applied = conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
                DatabaseError::new(DatabaseErrorKind::Migration(e.to_string()))
            })?;
            info!(count = applied.len(), "Applied media registry migrations");
            Ok(())
        })
        .await
    }

    /// Run `f` with a pooled connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> VellumResult<T>
    where
        F: FnOnce(&mut PgConnection) -> VellumResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        self.blocking
            .run(move || {
                let mut conn = pool.get().map_err(DatabaseError::from)?;
                f(&mut conn)
            })
            .await
    }
}

fn query_error(err: diesel::result::Error) -> VellumError {
    DatabaseError::from(err).into()
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

/// Escape LIKE metacharacters and wrap in wildcards.
fn like_pattern(keyword: &str) -> String {
    let mut pattern = String::with_capacity(keyword.len() + 2);
    pattern.push('%');
    for c in keyword.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
