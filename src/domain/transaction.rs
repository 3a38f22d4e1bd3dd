//! Transaction records as read from the backing store.

use crate::domain::error::RowRejected;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            other => Err(format!("unknown side '{other}'")),
        }
    }
}

/// One trade event. Immutable once read from the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRecord {
    pub date: NaiveDate,
    pub instrument: String,
    pub closing_price: f64,
    pub side: Side,
    pub quantity: f64,
    pub notional_value: f64,
    pub gain_loss: f64,
}

/// A store row before validation. Every column may be absent.
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    pub date: Option<NaiveDate>,
    pub instrument: Option<String>,
    pub closing_price: Option<f64>,
    pub side: Option<String>,
    pub quantity: Option<f64>,
    pub notional_value: Option<f64>,
    pub gain_loss: Option<f64>,
}

impl RawRow {
    /// Validate into a record. `row` is the zero-based position in the result
    /// set and is only used for the rejection message.
    pub fn into_record(self, row: usize) -> Result<TransactionRecord, RowRejected> {
        let reject = |reason: String| RowRejected { row, reason };

        let date = self.date.ok_or_else(|| reject("missing date".into()))?;
        let instrument = self
            .instrument
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| reject("missing instrument".into()))?;
        let side = self
            .side
            .ok_or_else(|| reject("missing side".into()))?
            .parse::<Side>()
            .map_err(reject)?;

        let closing_price = required(self.closing_price, "closing_price").map_err(reject)?;
        let quantity = required(self.quantity, "quantity").map_err(reject)?;
        let notional_value = required(self.notional_value, "notional_value").map_err(reject)?;
        let gain_loss = required(self.gain_loss, "gain_loss").map_err(reject)?;

        if closing_price < 0.0 {
            return Err(reject(format!("negative closing_price {closing_price}")));
        }
        if quantity < 0.0 {
            return Err(reject(format!("negative quantity {quantity}")));
        }

        Ok(TransactionRecord {
            date,
            instrument,
            closing_price,
            side,
            quantity,
            notional_value,
            gain_loss,
        })
    }
}

fn required(value: Option<f64>, field: &str) -> Result<f64, String> {
    match value {
        None => Err(format!("missing {field}")),
        Some(v) if !v.is_finite() => Err(format!("non-finite {field}")),
        Some(v) => Ok(v),
    }
}

/// Keep the valid records, logging and dropping each rejected row.
pub fn keep_valid<I>(rows: I) -> Vec<TransactionRecord>
where
    I: IntoIterator<Item = Result<TransactionRecord, RowRejected>>,
{
    let mut rejected = 0usize;
    let records: Vec<TransactionRecord> = rows
        .into_iter()
        .filter_map(|row| match row {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(row = e.row, reason = %e.reason, "skipping invalid store row");
                rejected += 1;
                None
            }
        })
        .collect();

    if rejected > 0 {
        tracing::warn!(rejected, kept = records.len(), "store rows rejected");
    }
    records
}

/// Parse a store date, truncating any time-of-day part.
///
/// Accepts `YYYY-MM-DD` optionally followed by `T` or a space and a time.
pub fn parse_store_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    let day = value.get(..10)?;
    match value.as_bytes().get(10) {
        None | Some(b'T') | Some(b' ') => NaiveDate::parse_from_str(day, "%Y-%m-%d").ok(),
        Some(_) => None,
    }
}
