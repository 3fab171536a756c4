//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `transactions` - Transaction inserts, dedup, and windowed queries
//! - `merchants` - Learned merchant identities and confirmation

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::Result;

mod merchants;
mod transactions;

pub use transactions::InsertOutcome;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
}

impl Database {
    /// Create a new database connection pool and run migrations
    pub fn new(path: &str) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database (for testing)
    ///
    /// Note: Uses a temporary file rather than `:memory:` because each pooled
    /// connection would otherwise open its own private in-memory database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = format!(
            "{}/cardwise_test_{}_{}.db",
            std::env::temp_dir().display(),
            std::process::id(),
            id
        );

        // Remove any existing file
        let _ = std::fs::remove_file(&path);

        Self::new(&path)
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Enable foreign keys
            PRAGMA foreign_keys = ON;

            -- WAL mode: better concurrency, readers don't block writers
            PRAGMA journal_mode = WAL;

            -- Synchronous NORMAL: good balance of safety and performance
            PRAGMA synchronous = NORMAL;

            -- Merchants (per-user learned identities)
            CREATE TABLE IF NOT EXISTS merchants (
                id INTEGER PRIMARY KEY,
                user_id TEXT NOT NULL,
                canonical_name TEXT NOT NULL,
                raw_names TEXT NOT NULL DEFAULT '[]',      -- JSON array of observed name variants
                category TEXT NOT NULL,
                confidence REAL NOT NULL DEFAULT 0.3,
                user_confirmed BOOLEAN NOT NULL DEFAULT 0,
                location TEXT,                             -- JSON GeoLocation
                transaction_count INTEGER NOT NULL DEFAULT 1,
                last_seen DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_merchants_user_name ON merchants(user_id, canonical_name);
            CREATE INDEX IF NOT EXISTS idx_merchants_user_confidence ON merchants(user_id, confidence);

            -- Transactions
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY,
                user_id TEXT NOT NULL,
                item_id TEXT NOT NULL,
                provider_transaction_id TEXT NOT NULL UNIQUE,   -- global dedup key
                account_id TEXT NOT NULL,
                account_name TEXT NOT NULL,
                account_type TEXT NOT NULL DEFAULT 'other',
                amount REAL NOT NULL,                      -- positive = inflow, negative = outflow
                date DATE NOT NULL,
                authorized_date DATE,
                merchant_name TEXT,
                merchant_id INTEGER REFERENCES merchants(id),
                category TEXT NOT NULL DEFAULT '[]',       -- JSON array of provider labels
                primary_category TEXT NOT NULL,
                pending BOOLEAN NOT NULL DEFAULT 0,
                currency_code TEXT NOT NULL DEFAULT 'USD',
                location TEXT,                             -- JSON GeoLocation
                payment_meta TEXT,                         -- JSON PaymentMeta
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Indexes for common queries
            CREATE INDEX IF NOT EXISTS idx_transactions_user_date ON transactions(user_id, date);
            CREATE INDEX IF NOT EXISTS idx_transactions_user_merchant ON transactions(user_id, merchant_name);
            CREATE INDEX IF NOT EXISTS idx_transactions_user_category ON transactions(user_id, primary_category);
            CREATE INDEX IF NOT EXISTS idx_transactions_pending ON transactions(pending);
            "#,
        )?;

        info!("Database schema initialized");
        Ok(())
    }
}
