//! Record filtering by instrument, date interval and side.

use crate::domain::transaction::{Side, TransactionRecord};
use chrono::NaiveDate;
use std::str::FromStr;

/// Side choice as offered to a user: both sides, or one of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SideSelection {
    #[default]
    All,
    Buy,
    Sell,
}

impl SideSelection {
    pub fn side(self) -> Option<Side> {
        match self {
            SideSelection::All => None,
            SideSelection::Buy => Some(Side::Buy),
            SideSelection::Sell => Some(Side::Sell),
        }
    }
}

impl FromStr for SideSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(SideSelection::All);
        }
        Ok(match s.parse::<Side>()? {
            Side::Buy => SideSelection::Buy,
            Side::Sell => SideSelection::Sell,
        })
    }
}

/// User-selected filters. A `None` dimension matches every record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    pub instrument: Option<String>,
    /// Inclusive `(start, end)`.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub side: Option<Side>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instrument(mut self, symbol: impl Into<String>) -> Self {
        self.instrument = Some(symbol.into());
        self
    }

    pub fn side(mut self, side: Side) -> Self {
        self.side = Some(side);
        self
    }

    pub fn side_selection(mut self, selection: SideSelection) -> Self {
        self.side = selection.side();
        self
    }

    pub fn between(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.date_range = Some((start, end));
        self
    }

    /// Apply a date selection as handed over by a date picker.
    ///
    /// Only a two-element selection becomes a date filter; an empty or
    /// single-bound selection clears it.
    pub fn date_selection(mut self, dates: &[NaiveDate]) -> Self {
        self.date_range = match dates {
            [start, end] => Some((*start, *end)),
            _ => None,
        };
        self
    }

    pub fn is_empty(&self) -> bool {
        self.instrument.is_none() && self.date_range.is_none() && self.side.is_none()
    }

    pub fn matches(&self, record: &TransactionRecord) -> bool {
        if let Some(ref symbol) = self.instrument {
            if record.instrument != *symbol {
                return false;
            }
        }
        if let Some((start, end)) = self.date_range {
            if record.date < start || record.date > end {
                return false;
            }
        }
        if let Some(side) = self.side {
            if record.side != side {
                return false;
            }
        }
        true
    }
}

/// Subset of `records` matching every dimension of `spec`, in original order.
pub fn apply(records: &[TransactionRecord], spec: &FilterSpec) -> Vec<TransactionRecord> {
    let filtered: Vec<TransactionRecord> = records
        .iter()
        .filter(|r| spec.matches(r))
        .cloned()
        .collect();

    tracing::debug!(
        input = records.len(),
        output = filtered.len(),
        ?spec,
        "filter applied"
    );
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(day: u32, instrument: &str, side: Side) -> TransactionRecord {
        TransactionRecord {
            date: date(2024, 1, day),
            instrument: instrument.into(),
            closing_price: 100.0,
            side,
            quantity: 1.0,
            notional_value: 100.0,
            gain_loss: 1.0,
        }
    }

    fn sample() -> Vec<TransactionRecord> {
        vec![
            record(5, "GC", Side::Buy),
            record(4, "CL", Side::Sell),
            record(3, "GC", Side::Sell),
            record(2, "CL", Side::Buy),
            record(1, "GC", Side::Buy),
        ]
    }

    #[test]
    fn side_selection_parses_and_maps() {
        assert_eq!("ALL".parse::<SideSelection>().unwrap(), SideSelection::All);
        assert_eq!(" Sell ".parse::<SideSelection>().unwrap().side(), Some(Side::Sell));
        assert_eq!(SideSelection::All.side(), None);
        assert!("hold".parse::<SideSelection>().is_err());
    }

    #[test]
    fn all_sides_clears_side_filter() {
        let spec = FilterSpec::new().side(Side::Buy).side_selection(SideSelection::All);
        assert_eq!(spec.side, None);
    }

    #[test]
    fn empty_spec_returns_input_unchanged() {
        let records = sample();
        assert_eq!(apply(&records, &FilterSpec::new()), records);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let spec = FilterSpec::new().instrument("GC").side(Side::Buy);
        assert!(apply(&[], &spec).is_empty());
    }

    #[test]
    fn instrument_filter_keeps_relative_order() {
        let out = apply(&sample(), &FilterSpec::new().instrument("GC"));
        let days: Vec<u32> = out.iter().map(|r| r.date.day()).collect();
        assert!(out.iter().all(|r| r.instrument == "GC"));
        assert_eq!(days, vec![5, 3, 1]);
    }

    #[test]
    fn instrument_filter_is_exact() {
        let out = apply(&sample(), &FilterSpec::new().instrument("G"));
        assert!(out.is_empty());
    }

    #[test]
    fn date_range_is_inclusive() {
        let spec = FilterSpec::new().between(date(2024, 1, 2), date(2024, 1, 4));
        let out = apply(&sample(), &spec);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].date, date(2024, 1, 4));
        assert_eq!(out[2].date, date(2024, 1, 2));
    }

    #[test]
    fn inverted_date_range_matches_nothing() {
        let spec = FilterSpec::new().between(date(2024, 1, 4), date(2024, 1, 2));
        assert!(apply(&sample(), &spec).is_empty());
    }

    #[test]
    fn single_bound_selection_applies_no_date_filter() {
        let spec = FilterSpec::new().date_selection(&[date(2024, 1, 3)]);
        assert_eq!(spec.date_range, None);
        assert_eq!(apply(&sample(), &spec), sample());
    }

    #[test]
    fn empty_and_oversized_selections_apply_no_date_filter() {
        assert_eq!(FilterSpec::new().date_selection(&[]).date_range, None);
        let three = [date(2024, 1, 1), date(2024, 1, 2), date(2024, 1, 3)];
        assert_eq!(FilterSpec::new().date_selection(&three).date_range, None);
    }

    #[test]
    fn single_bound_selection_clears_previous_range() {
        let spec = FilterSpec::new()
            .between(date(2024, 1, 2), date(2024, 1, 3))
            .date_selection(&[date(2024, 1, 2)]);
        assert!(spec.is_empty());
    }

    #[test]
    fn two_element_selection_filters() {
        let spec = FilterSpec::new().date_selection(&[date(2024, 1, 1), date(2024, 1, 2)]);
        assert_eq!(apply(&sample(), &spec).len(), 2);
    }

    #[test]
    fn dimensions_combine_with_and() {
        let spec = FilterSpec::new()
            .instrument("GC")
            .side(Side::Buy)
            .between(date(2024, 1, 2), date(2024, 1, 5));
        let out = apply(&sample(), &spec);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].date, date(2024, 1, 5));
    }

    #[test]
    fn apply_is_idempotent() {
        let spec = FilterSpec::new().side(Side::Sell);
        let once = apply(&sample(), &spec);
        assert_eq!(apply(&once, &spec), once);
    }
}
