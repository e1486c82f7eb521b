pub mod contacts;
pub mod error;
pub mod memory;
pub mod migrations;
pub mod store;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, TransactionBehavior};
use shared_types::{IdentifyRequest, IdentifyResponse};
use std::path::Path;
use std::time::Duration;

use crate::identity::{self, IdentityError, Observation};

pub use contacts::SqliteContactStore;
pub use error::{StoreError, StoreResult};
pub use memory::{MemoryContactStore, MemoryDatabase};
pub use store::{ContactStore, LinkUpdate, NewContact};

/// A place identities can be resolved against.
///
/// Implementations run each `identify` call as one atomic unit: every read
/// sees a consistent snapshot and the writes land together or not at all.
pub trait IdentityBackend: Send + Sync {
    fn identify(&self, request: &IdentifyRequest) -> Result<IdentifyResponse, IdentityError>;

    /// Cheap liveness check for the health endpoint.
    fn ping(&self) -> Result<(), StoreError>;
}

/// SQLite-backed contact database.
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    /// Open the database file, run migrations and build the connection pool
    pub fn new(db_path: &Path, pool_size: u32) -> anyhow::Result<Self> {
        // Ensure directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Run migrations on a plain connection before the pool opens
        {
            let conn = Connection::open(db_path)?;
            migrations::run_migrations(&conn)?;
        }

        // Pooled connections see the migrated schema
        let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
            conn.busy_timeout(Duration::from_secs(5))?;
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            Ok(())
        });

        let pool = Pool::builder().max_size(pool_size.max(1)).build(manager)?;

        Ok(Database { pool })
    }

    pub fn connection(&self) -> StoreResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Drop all contacts and recreate the schema.
    pub fn reset(&self) -> anyhow::Result<()> {
        let conn = self.connection()?;
        migrations::reset_contacts(&conn)
    }
}

impl IdentityBackend for Database {
    fn identify(&self, request: &IdentifyRequest) -> Result<IdentifyResponse, IdentityError> {
        let observation = Observation::from_request(request)?;

        let mut conn = self.connection()?;
        // IMMEDIATE takes the write lock up front, so concurrent resolutions
        // serialize instead of interleaving between read and write.
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;

        let resolution = {
            let mut store = SqliteContactStore::new(&tx);
            identity::resolve(&mut store, &observation)?
        };

        tx.commit().map_err(StoreError::from)?;

        Ok(resolution.into_response())
    }

    fn ping(&self) -> Result<(), StoreError> {
        let conn = self.connection()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }
}
