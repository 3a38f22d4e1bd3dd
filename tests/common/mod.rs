#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, TimeDelta, TimeZone, Utc};
use commodash::domain::error::StoreError;
use commodash::domain::transaction::{Side, TransactionRecord};
use commodash::ports::clock_port::Clock;
use commodash::ports::record_gateway::RecordGateway;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};

/// Gateway double. Counts fetches, can be switched to fail, and can hold
/// every fetch until `release` is called.
pub struct MockGateway {
    pub query: String,
    pub records: Vec<TransactionRecord>,
    fetches: AtomicUsize,
    failure: Mutex<Option<StoreError>>,
    gate: Mutex<bool>,
    opened: Condvar,
    in_flight: AtomicUsize,
}

impl MockGateway {
    pub fn new(records: Vec<TransactionRecord>) -> Self {
        Self {
            query: "mock:dm_commodities".to_string(),
            records,
            fetches: AtomicUsize::new(0),
            failure: Mutex::new(None),
            gate: Mutex::new(true),
            opened: Condvar::new(),
            in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_query(mut self, query: &str) -> Self {
        self.query = query.to_string();
        self
    }

    pub fn failing(self, reason: &str) -> Self {
        self.set_failure(Some(StoreError::Unavailable {
            reason: reason.to_string(),
        }));
        self
    }

    /// Fetches block until `release`.
    pub fn blocked(self) -> Self {
        *self.gate.lock().unwrap() = false;
        self
    }

    pub fn release(&self) {
        *self.gate.lock().unwrap() = true;
        self.opened.notify_all();
    }

    pub fn set_failure(&self, failure: Option<StoreError>) {
        *self.failure.lock().unwrap() = failure;
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

impl RecordGateway for MockGateway {
    fn query_id(&self) -> &str {
        &self.query
    }

    fn fetch(&self) -> Result<Vec<TransactionRecord>, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.in_flight.fetch_add(1, Ordering::SeqCst);

        let mut open = self.gate.lock().unwrap();
        while !*open {
            open = self.opened.wait(open).unwrap();
        }
        drop(open);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match self.failure.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(self.records.clone()),
        }
    }
}

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()),
        }
    }

    pub fn advance(&self, by: TimeDelta) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_record(
    date: &str,
    instrument: &str,
    side: Side,
    closing_price: f64,
    quantity: f64,
    gain_loss: f64,
) -> TransactionRecord {
    TransactionRecord {
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        instrument: instrument.to_string(),
        closing_price,
        side,
        quantity,
        notional_value: closing_price * quantity,
        gain_loss,
    }
}

/// Small mixed set, newest first as the stores return it.
pub fn sample_records() -> Vec<TransactionRecord> {
    vec![
        make_record("2024-01-05", "SI=F", Side::Buy, 23.5, 100.0, 35.0),
        make_record("2024-01-04", "CL=F", Side::Sell, 72.0, 10.0, -18.0),
        make_record("2024-01-03", "GC=F", Side::Buy, 2040.0, 1.0, 12.0),
        make_record("2024-01-03", "GC=F", Side::Sell, 2030.0, 1.0, -8.0),
        make_record("2024-01-02", "CL=F", Side::Buy, 70.0, 10.0, 6.0),
        make_record("2024-01-01", "GC=F", Side::Buy, 2000.0, 2.0, 50.0),
    ]
}
