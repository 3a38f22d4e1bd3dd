//! CSV file record store gateway.
//!
//! The file needs a header row naming the seven mapped columns; other
//! columns are ignored. Rows are returned newest first like the database
//! gateways.

use crate::domain::error::{DashboardError, RowRejected, StoreError};
use crate::domain::query::{ColumnMapping, DEFAULT_TABLE, RecordQuery};
use crate::domain::transaction::{RawRow, TransactionRecord, keep_valid, parse_store_date};
use crate::ports::config_port::ConfigPort;
use crate::ports::record_gateway::RecordGateway;
use csv::StringRecord;
use std::path::PathBuf;

pub struct CsvGateway {
    path: PathBuf,
    columns: ColumnMapping,
    query_id: String,
}

impl CsvGateway {
    pub fn new(path: PathBuf, columns: ColumnMapping) -> Self {
        let query_id = format!("csv:{}", path.display());
        Self {
            path,
            columns,
            query_id,
        }
    }

    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, DashboardError> {
        let path = config
            .get_string("csv", "path")
            .ok_or_else(|| DashboardError::ConfigMissing {
                section: "csv".into(),
                key: "path".into(),
            })?;
        let query = RecordQuery::from_config(config, DEFAULT_TABLE)?;
        Ok(Self::new(PathBuf::from(path), query.columns))
    }

    fn column_indices(&self, headers: &StringRecord) -> Result<[usize; 7], StoreError> {
        let c = &self.columns;
        let wanted = [
            &c.date,
            &c.instrument,
            &c.closing_price,
            &c.side,
            &c.quantity,
            &c.notional_value,
            &c.gain_loss,
        ];

        let mut indices = [0usize; 7];
        for (slot, name) in indices.iter_mut().zip(wanted) {
            *slot = headers
                .iter()
                .position(|h| h.trim() == name.as_str())
                .ok_or_else(|| StoreError::Query {
                    reason: format!("{}: missing column '{}'", self.path.display(), name),
                })?;
        }
        Ok(indices)
    }
}

fn field<'a>(record: &'a StringRecord, index: usize) -> Option<&'a str> {
    record.get(index).map(str::trim).filter(|v| !v.is_empty())
}

fn number(
    record: &StringRecord,
    index: usize,
    name: &str,
    row: usize,
) -> Result<Option<f64>, RowRejected> {
    field(record, index)
        .map(|v| {
            v.parse::<f64>().map_err(|e| RowRejected {
                row,
                reason: format!("invalid {name} '{v}': {e}"),
            })
        })
        .transpose()
}

fn decode(
    record: &StringRecord,
    idx: &[usize; 7],
    row: usize,
) -> Result<TransactionRecord, RowRejected> {
    let date = match field(record, idx[0]) {
        Some(text) => Some(parse_store_date(text).ok_or_else(|| RowRejected {
            row,
            reason: format!("invalid date '{text}'"),
        })?),
        None => None,
    };

    RawRow {
        date,
        instrument: field(record, idx[1]).map(str::to_string),
        closing_price: number(record, idx[2], "closing_price", row)?,
        side: field(record, idx[3]).map(str::to_string),
        quantity: number(record, idx[4], "quantity", row)?,
        notional_value: number(record, idx[5], "notional_value", row)?,
        gain_loss: number(record, idx[6], "gain_loss", row)?,
    }
    .into_record(row)
}

impl RecordGateway for CsvGateway {
    fn query_id(&self) -> &str {
        &self.query_id
    }

    fn fetch(&self) -> Result<Vec<TransactionRecord>, StoreError> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| StoreError::Unavailable {
                reason: format!("failed to open {}: {}", self.path.display(), e),
            })?;

        let headers = rdr
            .headers()
            .map_err(|e| StoreError::Query {
                reason: format!("CSV header error: {}", e),
            })?
            .clone();
        let idx = self.column_indices(&headers)?;

        let mut decoded = Vec::new();
        for (row, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| StoreError::Query {
                reason: format!("CSV parse error: {}", e),
            })?;
            decoded.push(decode(&record, &idx, row));
        }

        let mut records = keep_valid(decoded);
        records.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(records)
    }
}
