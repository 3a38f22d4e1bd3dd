//! Result cache in front of the record store gateway.
//!
//! Holds one record set tagged with the query identity that produced it and
//! the time it was fetched. An entry is served while it is younger than the
//! TTL, belongs to the requested query and has not been invalidated.
//!
//! Fetches are single-flight: while one caller is fetching, other callers
//! block on a condition variable and are served the outcome of that fetch,
//! success or failure. Failures are never stored as entries, so the next
//! call after a failed flight fetches again.

use crate::domain::error::StoreError;
use crate::domain::transaction::TransactionRecord;
use crate::ports::clock_port::Clock;
use crate::ports::record_gateway::{QueryId, RecordGateway};
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

pub const DEFAULT_TTL_SECS: i64 = 300;

#[derive(Debug, Clone)]
pub struct CachedResultSet {
    query_id: QueryId,
    records: Vec<TransactionRecord>,
    fetched_at: DateTime<Utc>,
}

impl CachedResultSet {
    pub fn new(
        query_id: impl Into<QueryId>,
        records: Vec<TransactionRecord>,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            query_id: query_id.into(),
            records,
            fetched_at,
        }
    }

    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn query_id(&self) -> &str {
        &self.query_id
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// The fetch currently running.
struct Flight {
    id: u64,
    query_id: QueryId,
    /// Callers blocked on this flight for the same query.
    waiters: usize,
}

/// Error of a failed flight, kept until each of its waiters has taken it.
struct Failure {
    error: StoreError,
    uncollected: usize,
}

#[derive(Default)]
struct State {
    entry: Option<Arc<CachedResultSet>>,
    flight: Option<Flight>,
    next_flight: u64,
    failures: HashMap<u64, Failure>,
    /// Bumped by `invalidate`; a flight started under an older generation
    /// does not install its result.
    generation: u64,
    waiting: usize,
}

pub struct ResultCache {
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
    state: Mutex<State>,
    settled: Condvar,
}

impl ResultCache {
    pub fn new(ttl: TimeDelta, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            state: Mutex::new(State::default()),
            settled: Condvar::new(),
        }
    }

    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // State is only ever updated by plain assignments, so a panic while
        // holding the lock cannot leave it half-written.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_fresh(&self, entry: &CachedResultSet, query_id: &str) -> bool {
        entry.query_id == query_id && self.clock.now() - entry.fetched_at < self.ttl
    }

    /// Current entry for `query_id` if it is still fresh. Never fetches.
    pub fn peek(&self, query_id: &str) -> Option<Arc<CachedResultSet>> {
        let state = self.lock();
        state
            .entry
            .as_ref()
            .filter(|entry| self.is_fresh(entry, query_id))
            .map(Arc::clone)
    }

    /// Return the cached set for the gateway's query, fetching it when the
    /// cache is empty, stale, invalidated or holds another query.
    pub fn get_or_fetch(
        &self,
        gateway: &dyn RecordGateway,
    ) -> Result<Arc<CachedResultSet>, StoreError> {
        let query_id = gateway.query_id();
        let mut state = self.lock();
        let mut awaited: Option<u64> = None;

        loop {
            if let Some(id) = awaited {
                if let Some(error) = take_failure(&mut state, id) {
                    return Err(error);
                }
            }

            if let Some(entry) = state.entry.as_ref() {
                if self.is_fresh(entry, query_id) {
                    tracing::debug!(query = query_id, records = entry.len(), "cache hit");
                    return Ok(Arc::clone(entry));
                }
            }

            match state.flight.as_mut() {
                Some(flight) => {
                    if flight.query_id != query_id {
                        awaited = None;
                    } else if awaited != Some(flight.id) {
                        flight.waiters += 1;
                        awaited = Some(flight.id);
                    }
                    state.waiting += 1;
                    state = self
                        .settled
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                    state.waiting -= 1;
                }
                None => break,
            }
        }

        let flight = state.next_flight;
        state.next_flight += 1;
        state.flight = Some(Flight {
            id: flight,
            query_id: query_id.to_string(),
            waiters: 0,
        });
        let generation = state.generation;
        drop(state);

        let guard = FlightGuard {
            cache: self,
            flight,
        };

        tracing::debug!(query = query_id, "cache miss, fetching");
        let started = Instant::now();
        let result = gateway.fetch();

        let mut state = self.lock();
        let waiters = state.flight.take().map_or(0, |f| f.waiters);
        let outcome = match result {
            Ok(records) => {
                let entry = Arc::new(CachedResultSet::new(query_id, records, self.clock.now()));
                tracing::info!(
                    query = query_id,
                    records = entry.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "fetched record set"
                );
                if state.generation == generation {
                    state.entry = Some(Arc::clone(&entry));
                } else {
                    tracing::debug!(query = query_id, "cache invalidated during fetch, not storing");
                }
                Ok(entry)
            }
            Err(err) => {
                tracing::warn!(query = query_id, error = %err, "fetch failed");
                if waiters > 0 {
                    state.failures.insert(
                        flight,
                        Failure {
                            error: err.clone(),
                            uncollected: waiters,
                        },
                    );
                }
                Err(err)
            }
        };
        drop(state);
        drop(guard);

        outcome
    }

    /// Drop the current entry so the next `get_or_fetch` re-fetches.
    pub fn invalidate(&self) {
        let mut state = self.lock();
        state.entry = None;
        state.generation += 1;
        tracing::debug!(generation = state.generation, "cache invalidated");
    }

    /// Number of callers currently blocked on an in-flight fetch.
    pub fn waiting(&self) -> usize {
        self.lock().waiting
    }
}

/// Hands out the error of failed flight `id` to one of its waiters.
fn take_failure(state: &mut State, id: u64) -> Option<StoreError> {
    let failure = state.failures.get_mut(&id)?;
    failure.uncollected -= 1;
    let error = failure.error.clone();
    if failure.uncollected == 0 {
        state.failures.remove(&id);
    }
    Some(error)
}

/// Clears the flight marker and wakes waiters when a fetch ends, including
/// when the gateway panics.
struct FlightGuard<'a> {
    cache: &'a ResultCache,
    flight: u64,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.cache.lock();
        if matches!(state.flight, Some(ref f) if f.id == self.flight) {
            state.flight = None;
        }
        drop(state);
        self.cache.settled.notify_all();
    }
}
