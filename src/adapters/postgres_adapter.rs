//! PostgreSQL record store gateway.

use crate::domain::config_validation::pool_size;
use crate::domain::error::{DashboardError, StoreError};
use crate::domain::query::RecordQuery;
use crate::domain::transaction::{RawRow, TransactionRecord, keep_valid};
use crate::ports::config_port::ConfigPort;
use crate::ports::record_gateway::RecordGateway;
use chrono::NaiveDate;
use postgres::{NoTls, Row};
use r2d2::Pool;
use r2d2_postgres::PostgresConnectionManager;
use std::time::Duration;

pub const DEFAULT_TABLE: &str = "public.dm_commodities";

pub struct PostgresGateway {
    pool: Pool<PostgresConnectionManager<NoTls>>,
    sql: String,
    query_id: String,
}

impl PostgresGateway {
    /// Build the gateway without connecting. Connection failures surface on
    /// the first `fetch`.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, DashboardError> {
        // Try [postgres] connection_string first, fall back to [database] conninfo
        let connection_string = config
            .get_string("postgres", "connection_string")
            .or_else(|| config.get_string("database", "conninfo"))
            .ok_or_else(|| DashboardError::ConfigMissing {
                section: "database".into(),
                key: "conninfo".into(),
            })?;

        let pg_config: postgres::Config =
            connection_string
                .parse()
                .map_err(|e: postgres::Error| DashboardError::ConfigInvalid {
                    section: "postgres".into(),
                    key: "connection_string".into(),
                    reason: e.to_string(),
                })?;

        let query = RecordQuery::from_config(config, DEFAULT_TABLE)?;
        let pool_size = pool_size(config, "postgres")?;
        let timeout = config.get_int("postgres", "connect_timeout_secs", 30).max(1) as u64;

        let manager = PostgresConnectionManager::new(pg_config, NoTls);
        let pool = Pool::builder()
            .max_size(pool_size)
            .connection_timeout(Duration::from_secs(timeout))
            .build_unchecked(manager);

        let sql = query.postgres_sql();
        Ok(Self {
            pool,
            query_id: format!("postgres:{sql}"),
            sql,
        })
    }
}

fn decode_row(row: &Row) -> Result<RawRow, postgres::Error> {
    Ok(RawRow {
        date: row.try_get::<_, Option<NaiveDate>>(0)?,
        instrument: row.try_get(1)?,
        closing_price: row.try_get(2)?,
        side: row.try_get(3)?,
        quantity: row.try_get(4)?,
        notional_value: row.try_get(5)?,
        gain_loss: row.try_get(6)?,
    })
}

impl RecordGateway for PostgresGateway {
    fn query_id(&self) -> &str {
        &self.query_id
    }

    fn fetch(&self) -> Result<Vec<TransactionRecord>, StoreError> {
        let mut conn = self
            .pool
            .get()
            .map_err(|e: r2d2::Error| StoreError::Unavailable {
                reason: e.to_string(),
            })?;

        let rows = conn
            .query(self.sql.as_str(), &[])
            .map_err(|e| StoreError::Query {
                reason: e.to_string(),
            })?;

        let mut decoded = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            let raw = decode_row(row).map_err(|e| StoreError::Query {
                reason: format!("row {i}: {e}"),
            })?;
            decoded.push(raw.into_record(i));
        }

        Ok(keep_valid(decoded))
    }
}
