//! SQLite record store gateway.

use crate::domain::config_validation::pool_size;
use crate::domain::error::{DashboardError, RowRejected, StoreError};
use crate::domain::query::{DEFAULT_TABLE, RecordQuery};
use crate::domain::transaction::{RawRow, TransactionRecord, keep_valid, parse_store_date};
use crate::ports::config_port::ConfigPort;
use crate::ports::record_gateway::RecordGateway;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{OpenFlags, params};
use std::time::Duration;

pub struct SqliteGateway {
    pool: Pool<SqliteConnectionManager>,
    query: RecordQuery,
    query_id: String,
}

impl SqliteGateway {
    /// Open the database at `[sqlite] path` read-only.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, DashboardError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| DashboardError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let query = RecordQuery::from_config(config, DEFAULT_TABLE)?;
        let pool_size = pool_size(config, "sqlite")?;
        let timeout = config.get_int("sqlite", "connect_timeout_secs", 30).max(1) as u64;

        let manager = SqliteConnectionManager::file(&db_path).with_flags(
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        );
        let pool = Pool::builder()
            .max_size(pool_size)
            .connection_timeout(Duration::from_secs(timeout))
            .build_unchecked(manager);

        Ok(Self {
            pool,
            query_id: format!("sqlite:{db_path}:{}", query.sql()),
            query,
        })
    }

    /// Writable in-memory database using the default table layout. Used for
    /// fixtures; seed it with `initialize_schema` and `insert_records`.
    pub fn in_memory() -> Result<Self, DashboardError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| StoreError::Unavailable {
                reason: e.to_string(),
            })?;

        let query = RecordQuery::default();
        Ok(Self {
            pool,
            query_id: format!("sqlite::memory:{}", query.sql()),
            query,
        })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, StoreError> {
        self.pool.get().map_err(|e: r2d2::Error| StoreError::Unavailable {
            reason: e.to_string(),
        })
    }

    pub fn initialize_schema(&self) -> Result<(), StoreError> {
        let c = &self.query.columns;
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                {} TEXT,
                {} TEXT,
                {} REAL,
                {} TEXT,
                {} REAL,
                {} REAL,
                {} REAL
            );
            CREATE INDEX IF NOT EXISTS idx_{}_date ON {}({});",
            self.query.table,
            c.date,
            c.instrument,
            c.closing_price,
            c.side,
            c.quantity,
            c.notional_value,
            c.gain_loss,
            self.query.table.replace('.', "_"),
            self.query.table,
            c.date,
        );

        self.conn()?
            .execute_batch(&ddl)
            .map_err(|e: rusqlite::Error| StoreError::Query {
                reason: e.to_string(),
            })
    }

    pub fn insert_records(&self, records: &[TransactionRecord]) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let c = &self.query.columns;
        let sql = format!(
            "INSERT INTO {} ({}, {}, {}, {}, {}, {}, {}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            self.query.table,
            c.date,
            c.instrument,
            c.closing_price,
            c.side,
            c.quantity,
            c.notional_value,
            c.gain_loss,
        );

        let query_err = |e: rusqlite::Error| StoreError::Query {
            reason: e.to_string(),
        };
        let tx = conn.transaction().map_err(query_err)?;
        for record in records {
            tx.execute(
                &sql,
                params![
                    record.date.format("%Y-%m-%d").to_string(),
                    record.instrument,
                    record.closing_price,
                    record.side.as_str(),
                    record.quantity,
                    record.notional_value,
                    record.gain_loss
                ],
            )
            .map_err(query_err)?;
        }
        tx.commit().map_err(query_err)
    }

    /// Run a raw statement against the fixture database.
    pub fn execute(&self, sql: &str) -> Result<(), StoreError> {
        self.conn()?
            .execute_batch(sql)
            .map_err(|e: rusqlite::Error| StoreError::Query {
                reason: e.to_string(),
            })
    }
}

impl RecordGateway for SqliteGateway {
    fn query_id(&self) -> &str {
        &self.query_id
    }

    fn fetch(&self) -> Result<Vec<TransactionRecord>, StoreError> {
        let conn = self.conn()?;
        let query_err = |e: rusqlite::Error| StoreError::Query {
            reason: e.to_string(),
        };

        let mut stmt = conn.prepare(&self.query.sql()).map_err(query_err)?;
        let rows = stmt
            .query_map([], |row| {
                let date: Option<String> = row.get(0)?;
                Ok((
                    date,
                    RawRow {
                        date: None,
                        instrument: row.get(1)?,
                        closing_price: row.get(2)?,
                        side: row.get(3)?,
                        quantity: row.get(4)?,
                        notional_value: row.get(5)?,
                        gain_loss: row.get(6)?,
                    },
                ))
            })
            .map_err(query_err)?;

        let mut decoded = Vec::new();
        for (i, row) in rows.enumerate() {
            let (date_text, mut raw) = row.map_err(query_err)?;
            if let Some(text) = date_text {
                match parse_store_date(&text) {
                    Some(date) => raw.date = Some(date),
                    None => {
                        decoded.push(Err(RowRejected {
                            row: i,
                            reason: format!("invalid date '{text}'"),
                        }));
                        continue;
                    }
                }
            }
            decoded.push(raw.into_record(i));
        }

        Ok(keep_valid(decoded))
    }
}
