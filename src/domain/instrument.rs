//! Instrument display labels and selector options.

use crate::domain::transaction::TransactionRecord;
use std::collections::HashSet;

/// Friendly name for a futures symbol; unknown symbols map to themselves.
pub fn instrument_label(symbol: &str) -> &str {
    match symbol {
        "CL=F" => "Oil (WTI)",
        "GC=F" => "Gold",
        "SI=F" => "Silver",
        other => other,
    }
}

/// `"GC=F (Gold)"` style text for a selector entry.
pub fn option_text(symbol: &str) -> String {
    format!("{} ({})", symbol, instrument_label(symbol))
}

/// Distinct instruments in the order they first appear.
pub fn instrument_options(records: &[TransactionRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|r| seen.insert(r.instrument.as_str()))
        .map(|r| r.instrument.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::transaction::Side;
    use chrono::NaiveDate;

    #[test]
    fn known_symbols_have_labels() {
        assert_eq!(instrument_label("CL=F"), "Oil (WTI)");
        assert_eq!(instrument_label("GC=F"), "Gold");
        assert_eq!(instrument_label("SI=F"), "Silver");
    }

    #[test]
    fn unknown_symbol_is_its_own_label() {
        assert_eq!(instrument_label("HG=F"), "HG=F");
        assert_eq!(option_text("HG=F"), "HG=F (HG=F)");
        assert_eq!(option_text("GC=F"), "GC=F (Gold)");
    }

    #[test]
    fn options_keep_first_seen_order() {
        let make = |instrument: &str| TransactionRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            instrument: instrument.into(),
            closing_price: 1.0,
            side: Side::Buy,
            quantity: 1.0,
            notional_value: 1.0,
            gain_loss: 0.0,
        };
        let records = vec![make("SI=F"), make("GC=F"), make("SI=F"), make("CL=F")];
        assert_eq!(instrument_options(&records), vec!["SI=F", "GC=F", "CL=F"]);
    }
}
