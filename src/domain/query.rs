//! The read query issued against the transaction table.
//!
//! Table and column names come from configuration, so every identifier is
//! checked before it is spliced into SQL.

use crate::domain::error::DashboardError;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_TABLE: &str = "dm_commodities";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub date: String,
    pub instrument: String,
    pub closing_price: String,
    pub side: String,
    pub quantity: String,
    pub notional_value: String,
    pub gain_loss: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            date: "data".into(),
            instrument: "simbolo".into(),
            closing_price: "valor_fechamento".into(),
            side: "acao".into(),
            quantity: "quantidade".into(),
            notional_value: "valor".into(),
            gain_loss: "ganho".into(),
        }
    }
}

impl ColumnMapping {
    /// `(config key, column)` pairs in select order.
    fn keyed(&self) -> [(&'static str, &str); 7] {
        [
            ("date_column", self.date.as_str()),
            ("instrument_column", self.instrument.as_str()),
            ("closing_price_column", self.closing_price.as_str()),
            ("side_column", self.side.as_str()),
            ("quantity_column", self.quantity.as_str()),
            ("notional_value_column", self.notional_value.as_str()),
            ("gain_loss_column", self.gain_loss.as_str()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordQuery {
    pub table: String,
    pub columns: ColumnMapping,
}

impl Default for RecordQuery {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE.into(),
            columns: ColumnMapping::default(),
        }
    }
}

impl RecordQuery {
    /// Read `[query]` from config, falling back to `default_table` and the
    /// default column mapping.
    pub fn from_config(
        config: &dyn ConfigPort,
        default_table: &str,
    ) -> Result<Self, DashboardError> {
        let defaults = ColumnMapping::default();
        let column = |key: &str, default: &str| config.get_string_or("query", key, default);

        let query = Self {
            table: config.get_string_or("query", "table", default_table),
            columns: ColumnMapping {
                date: column("date_column", defaults.date.as_str()),
                instrument: column("instrument_column", defaults.instrument.as_str()),
                closing_price: column("closing_price_column", defaults.closing_price.as_str()),
                side: column("side_column", defaults.side.as_str()),
                quantity: column("quantity_column", defaults.quantity.as_str()),
                notional_value: column("notional_value_column", defaults.notional_value.as_str()),
                gain_loss: column("gain_loss_column", defaults.gain_loss.as_str()),
            },
        };
        query.validate()?;
        Ok(query)
    }

    pub fn validate(&self) -> Result<(), DashboardError> {
        if !is_table_name(&self.table) {
            return Err(invalid("table", &self.table));
        }
        for (key, column) in self.columns.keyed() {
            if !is_identifier(column) {
                return Err(invalid(key, column));
            }
        }
        Ok(())
    }

    /// Plain `SELECT` of the seven columns, newest first.
    pub fn sql(&self) -> String {
        let c = &self.columns;
        format!(
            "SELECT {}, {}, {}, {}, {}, {}, {} FROM {} ORDER BY {} DESC",
            c.date,
            c.instrument,
            c.closing_price,
            c.side,
            c.quantity,
            c.notional_value,
            c.gain_loss,
            self.table,
            c.date
        )
    }

    /// `SELECT` with PostgreSQL casts so every column decodes into a fixed
    /// Rust type regardless of the declared column type.
    pub fn postgres_sql(&self) -> String {
        let c = &self.columns;
        format!(
            "SELECT {}::date, {}::text, {}::double precision, {}::text, \
             {}::double precision, {}::double precision, {}::double precision \
             FROM {} ORDER BY {} DESC",
            c.date,
            c.instrument,
            c.closing_price,
            c.side,
            c.quantity,
            c.notional_value,
            c.gain_loss,
            self.table,
            c.date
        )
    }
}

fn invalid(key: &str, value: &str) -> DashboardError {
    DashboardError::ConfigInvalid {
        section: "query".into(),
        key: key.into(),
        reason: format!("'{value}' is not a plain SQL identifier"),
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `table` or `schema.table`.
fn is_table_name(s: &str) -> bool {
    match s.split_once('.') {
        Some((schema, table)) => is_identifier(schema) && is_identifier(table),
        None => is_identifier(s),
    }
}
