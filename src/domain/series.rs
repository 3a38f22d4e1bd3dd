//! Time-series projections over a record set.
//!
//! Both projections return an empty map for an empty input. Callers decide
//! how to present "insufficient data".

use crate::domain::transaction::TransactionRecord;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// `(date, instrument) -> mean closing price`.
pub type PriceSeries = BTreeMap<(NaiveDate, String), f64>;

/// `date -> summed gain/loss` across all instruments.
pub type GainLossSeries = BTreeMap<NaiveDate, f64>;

pub fn price_series(records: &[TransactionRecord]) -> PriceSeries {
    let mut sums: BTreeMap<(NaiveDate, String), (f64, usize)> = BTreeMap::new();

    for record in records {
        let entry = sums
            .entry((record.date, record.instrument.clone()))
            .or_insert((0.0, 0));
        entry.0 += record.closing_price;
        entry.1 += 1;
    }

    sums.into_iter()
        .map(|(key, (sum, count))| (key, sum / count as f64))
        .collect()
}

pub fn gain_loss_series(records: &[TransactionRecord]) -> GainLossSeries {
    let mut series = GainLossSeries::new();
    for record in records {
        *series.entry(record.date).or_insert(0.0) += record.gain_loss;
    }
    series
}

/// Instruments present in the price series, ordered by symbol.
pub fn series_instruments(series: &PriceSeries) -> Vec<&str> {
    let mut instruments: Vec<&str> = series.keys().map(|(_, i)| i.as_str()).collect();
    instruments.sort_unstable();
    instruments.dedup();
    instruments
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummaryRow {
    pub date: NaiveDate,
    pub instrument: String,
    pub mean_closing_price: f64,
    pub quantity: f64,
    pub notional_value: f64,
    pub gain_loss: f64,
}

/// Records grouped by `(date, instrument)`, ascending.
pub fn daily_summary(records: &[TransactionRecord]) -> Vec<DailySummaryRow> {
    #[derive(Default)]
    struct Acc {
        price_sum: f64,
        count: usize,
        quantity: f64,
        notional_value: f64,
        gain_loss: f64,
    }

    let mut groups: BTreeMap<(NaiveDate, &str), Acc> = BTreeMap::new();
    for record in records {
        let acc = groups
            .entry((record.date, record.instrument.as_str()))
            .or_default();
        acc.price_sum += record.closing_price;
        acc.count += 1;
        acc.quantity += record.quantity;
        acc.notional_value += record.notional_value;
        acc.gain_loss += record.gain_loss;
    }

    groups
        .into_iter()
        .map(|((date, instrument), acc)| DailySummaryRow {
            date,
            instrument: instrument.to_string(),
            mean_closing_price: acc.price_sum / acc.count as f64,
            quantity: acc.quantity,
            notional_value: acc.notional_value,
            gain_loss: acc.gain_loss,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::transaction::Side;
    use approx::assert_relative_eq;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn rec(day: u32, instrument: &str, price: f64, qty: f64, gain: f64) -> TransactionRecord {
        TransactionRecord {
            date: date(day),
            instrument: instrument.into(),
            closing_price: price,
            side: Side::Buy,
            quantity: qty,
            notional_value: price * qty,
            gain_loss: gain,
        }
    }

    #[test]
    fn empty_input_gives_empty_series() {
        assert!(price_series(&[]).is_empty());
        assert!(gain_loss_series(&[]).is_empty());
        assert!(daily_summary(&[]).is_empty());
    }

    #[test]
    fn price_series_averages_same_day_same_instrument() {
        let records = vec![
            rec(2, "GC", 2010.0, 1.0, 0.0),
            rec(1, "GC", 2000.0, 1.0, 0.0),
            rec(1, "GC", 2004.0, 2.0, 0.0),
            rec(1, "CL", 80.0, 1.0, 0.0),
        ];
        let series = price_series(&records);

        assert_eq!(series.len(), 3);
        assert_relative_eq!(series[&(date(1), "GC".to_string())], 2002.0);
        assert_relative_eq!(series[&(date(2), "GC".to_string())], 2010.0);
        assert_relative_eq!(series[&(date(1), "CL".to_string())], 80.0);
    }

    #[test]
    fn price_series_keys_are_date_ordered() {
        let records = vec![rec(3, "GC", 1.0, 1.0, 0.0), rec(1, "GC", 1.0, 1.0, 0.0)];
        let dates: Vec<NaiveDate> = price_series(&records).keys().map(|(d, _)| *d).collect();
        assert_eq!(dates, vec![date(1), date(3)]);
    }

    #[test]
    fn gain_loss_series_sums_across_instruments() {
        let records = vec![
            rec(1, "GC", 2000.0, 1.0, 50.0),
            rec(1, "CL", 80.0, 1.0, -10.0),
            rec(2, "GC", 2010.0, 1.0, -20.0),
        ];
        let series = gain_loss_series(&records);

        assert_eq!(series.len(), 2);
        assert_relative_eq!(series[&date(1)], 40.0);
        assert_relative_eq!(series[&date(2)], -20.0);
    }

    #[test]
    fn series_instruments_are_distinct() {
        let records = vec![
            rec(1, "SI", 25.0, 1.0, 0.0),
            rec(2, "GC", 2000.0, 1.0, 0.0),
            rec(1, "GC", 2000.0, 1.0, 0.0),
        ];
        assert_eq!(series_instruments(&price_series(&records)), vec!["GC", "SI"]);
    }

    #[test]
    fn daily_summary_groups_by_date_and_instrument() {
        let records = vec![
            rec(1, "GC", 2000.0, 1.0, 5.0),
            rec(1, "GC", 2010.0, 3.0, -1.0),
            rec(1, "CL", 80.0, 10.0, 2.0),
        ];
        let rows = daily_summary(&records);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].instrument, "CL");
        let gold = &rows[1];
        assert_relative_eq!(gold.mean_closing_price, 2005.0);
        assert_relative_eq!(gold.quantity, 4.0);
        assert_relative_eq!(gold.notional_value, 2000.0 + 6030.0);
        assert_relative_eq!(gold.gain_loss, 4.0);
    }
}
