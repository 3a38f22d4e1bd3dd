//! Summary KPIs and per-instrument breakdowns.

use crate::domain::transaction::TransactionRecord;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSummary {
    pub total_invested: f64,
    pub total_gain_loss: f64,
    pub roi_percent: f64,
    pub transaction_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentBreakdown {
    pub instrument: String,
    pub gain_loss_sum: f64,
    pub invested_sum: f64,
    pub quantity_sum: f64,
    pub roi_percent: f64,
}

/// `gain / invested * 100`, or 0 when nothing was invested.
pub fn roi_percent(gain_loss: f64, invested: f64) -> f64 {
    if invested > 0.0 {
        (gain_loss / invested) * 100.0
    } else {
        0.0
    }
}

pub fn summarize(records: &[TransactionRecord]) -> KpiSummary {
    let mut total_invested = 0.0_f64;
    let mut total_gain_loss = 0.0_f64;

    for record in records {
        total_invested += record.notional_value;
        total_gain_loss += record.gain_loss;
    }

    KpiSummary {
        total_invested,
        total_gain_loss,
        roi_percent: roi_percent(total_gain_loss, total_invested),
        transaction_count: records.len(),
    }
}

/// One entry per distinct instrument, ordered by symbol.
pub fn breakdown_by_instrument(records: &[TransactionRecord]) -> Vec<InstrumentBreakdown> {
    let mut groups: BTreeMap<&str, (f64, f64, f64)> = BTreeMap::new();

    for record in records {
        let entry = groups
            .entry(record.instrument.as_str())
            .or_insert((0.0, 0.0, 0.0));
        entry.0 += record.gain_loss;
        entry.1 += record.notional_value;
        entry.2 += record.quantity;
    }

    groups
        .into_iter()
        .map(
            |(instrument, (gain_loss_sum, invested_sum, quantity_sum))| InstrumentBreakdown {
                instrument: instrument.to_string(),
                gain_loss_sum,
                invested_sum,
                quantity_sum,
                roi_percent: roi_percent(gain_loss_sum, invested_sum),
            },
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::transaction::Side;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn make_record(
        day: u32,
        instrument: &str,
        side: Side,
        value: f64,
        gain: f64,
    ) -> TransactionRecord {
        TransactionRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            instrument: instrument.to_string(),
            closing_price: value,
            side,
            quantity: 1.0,
            notional_value: value,
            gain_loss: gain,
        }
    }

    #[test]
    fn summarize_empty_set() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_invested, 0.0);
        assert_eq!(summary.total_gain_loss, 0.0);
        assert_eq!(summary.roi_percent, 0.0);
        assert_eq!(summary.transaction_count, 0);
    }

    #[test]
    fn summarize_gold_round_trip() {
        let records = vec![
            make_record(1, "GC", Side::Buy, 2000.0, 50.0),
            make_record(2, "GC", Side::Sell, 2010.0, -20.0),
        ];
        let summary = summarize(&records);

        assert_relative_eq!(summary.total_invested, 4010.0);
        assert_relative_eq!(summary.total_gain_loss, 30.0);
        // 30 / 4010 * 100 = 0.748..., shown as 0.75
        assert_relative_eq!(summary.roi_percent, 30.0 / 4010.0 * 100.0);
        assert_eq!((summary.roi_percent * 100.0).round() / 100.0, 0.75);
        assert_eq!(summary.transaction_count, 2);
    }

    #[test]
    fn roi_is_zero_when_nothing_invested() {
        let records = vec![make_record(1, "GC", Side::Buy, 0.0, 25.0)];
        let summary = summarize(&records);
        assert_eq!(summary.roi_percent, 0.0);
        assert!(summary.roi_percent.is_finite());
    }

    #[test]
    fn roi_is_zero_when_invested_is_negative() {
        assert_eq!(roi_percent(10.0, -100.0), 0.0);
    }

    #[test]
    fn negative_roi() {
        assert_relative_eq!(roi_percent(-50.0, 200.0), -25.0);
    }

    #[test]
    fn breakdown_groups_by_instrument_in_symbol_order() {
        let records = vec![
            make_record(3, "SI", Side::Buy, 25.0, 1.0),
            make_record(2, "GC", Side::Buy, 2000.0, 40.0),
            make_record(1, "CL", Side::Sell, 80.0, -4.0),
            make_record(1, "GC", Side::Sell, 2000.0, 10.0),
        ];
        let breakdown = breakdown_by_instrument(&records);

        let symbols: Vec<&str> = breakdown.iter().map(|b| b.instrument.as_str()).collect();
        assert_eq!(symbols, vec!["CL", "GC", "SI"]);

        let gold = &breakdown[1];
        assert_relative_eq!(gold.gain_loss_sum, 50.0);
        assert_relative_eq!(gold.invested_sum, 4000.0);
        assert_relative_eq!(gold.quantity_sum, 2.0);
        assert_relative_eq!(gold.roi_percent, 1.25);

        assert_relative_eq!(breakdown[0].roi_percent, -5.0);
    }

    #[test]
    fn breakdown_zero_invested_instrument_does_not_leak_nan() {
        let records = vec![
            make_record(1, "GC", Side::Buy, 2000.0, 20.0),
            make_record(1, "XX", Side::Buy, 0.0, 5.0),
        ];
        let breakdown = breakdown_by_instrument(&records);

        assert_eq!(breakdown.len(), 2);
        assert_relative_eq!(breakdown[0].roi_percent, 1.0);
        assert_eq!(breakdown[1].roi_percent, 0.0);
        assert!(breakdown.iter().all(|b| b.roi_percent.is_finite()));
    }

    #[test]
    fn breakdown_sums_match_summary() {
        let records = vec![
            make_record(1, "GC", Side::Buy, 2000.0, 50.0),
            make_record(2, "CL", Side::Sell, 75.0, -3.5),
            make_record(3, "GC", Side::Sell, 2010.0, -20.0),
        ];
        let total: f64 = breakdown_by_instrument(&records)
            .iter()
            .map(|b| b.gain_loss_sum)
            .sum();
        assert_relative_eq!(total, summarize(&records).total_gain_loss);
    }

    #[test]
    fn breakdown_empty_set() {
        assert!(breakdown_by_instrument(&[]).is_empty());
    }
}
