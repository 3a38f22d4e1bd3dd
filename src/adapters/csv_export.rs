//! CSV export of a filtered record set.

use crate::domain::error::DashboardError;
use crate::domain::transaction::TransactionRecord;
use chrono::{DateTime, Utc};
use std::io::Write;

/// `commodities_data_<YYYYmmdd_HHMMSS>.csv`
pub fn default_export_name(now: DateTime<Utc>) -> String {
    format!("commodities_data_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

/// Write `records` with a header row. Returns the number of data rows.
pub fn export_csv<W: Write>(
    records: &[TransactionRecord],
    writer: W,
) -> Result<usize, DashboardError> {
    let export_err = |e: csv::Error| DashboardError::Export {
        reason: e.to_string(),
    };

    let mut wtr = csv::Writer::from_writer(writer);
    if records.is_empty() {
        // serialize() only emits the header alongside the first row
        wtr.write_record([
            "date",
            "instrument",
            "closing_price",
            "side",
            "quantity",
            "notional_value",
            "gain_loss",
        ])
        .map_err(export_err)?;
    }
    for record in records {
        wtr.serialize(record).map_err(export_err)?;
    }
    wtr.flush()?;
    Ok(records.len())
}
