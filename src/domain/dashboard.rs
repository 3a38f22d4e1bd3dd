//! Dashboard service: cached record set in, filtered views out.

use crate::domain::cache::{CachedResultSet, ResultCache};
use crate::domain::error::DashboardError;
use crate::domain::filter::{self, FilterSpec};
use crate::domain::instrument::instrument_options;
use crate::domain::kpi::{self, InstrumentBreakdown, KpiSummary};
use crate::domain::series::{self, DailySummaryRow, GainLossSeries, PriceSeries};
use crate::domain::transaction::TransactionRecord;
use crate::ports::clock_port::Clock;
use crate::ports::record_gateway::RecordGateway;
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use std::sync::Arc;

/// Everything a dashboard page shows for one filter selection.
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub records: Vec<TransactionRecord>,
    pub summary: KpiSummary,
    pub breakdown: Vec<InstrumentBreakdown>,
    pub prices: PriceSeries,
    pub gain_loss: GainLossSeries,
    pub daily: Vec<DailySummaryRow>,
    /// When the underlying record set was fetched from the store.
    pub fetched_at: DateTime<Utc>,
}

/// Loaded-data panel for the unfiltered record set.
#[derive(Debug, Clone, PartialEq)]
pub struct DataStatus {
    pub record_count: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub instruments: Vec<String>,
    pub fetched_at: DateTime<Utc>,
}

impl DataStatus {
    pub fn from_result_set(set: &CachedResultSet) -> Self {
        let records = set.records();
        Self {
            record_count: records.len(),
            first_date: records.iter().map(|r| r.date).min(),
            last_date: records.iter().map(|r| r.date).max(),
            instruments: instrument_options(records),
            fetched_at: set.fetched_at(),
        }
    }
}

pub struct Dashboard {
    gateway: Arc<dyn RecordGateway>,
    cache: ResultCache,
}

impl Dashboard {
    pub fn new(gateway: Arc<dyn RecordGateway>, cache: ResultCache) -> Self {
        Self { gateway, cache }
    }

    pub fn with_ttl(gateway: Arc<dyn RecordGateway>, ttl: TimeDelta, clock: Arc<dyn Clock>) -> Self {
        Self::new(gateway, ResultCache::new(ttl, clock))
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Unfiltered record set, served from the cache when fresh.
    pub fn records(&self) -> Result<Arc<CachedResultSet>, DashboardError> {
        Ok(self.cache.get_or_fetch(self.gateway.as_ref())?)
    }

    pub fn view(&self, spec: &FilterSpec) -> Result<DashboardView, DashboardError> {
        let set = self.records()?;
        let records = filter::apply(set.records(), spec);

        Ok(DashboardView {
            summary: kpi::summarize(&records),
            breakdown: kpi::breakdown_by_instrument(&records),
            prices: series::price_series(&records),
            gain_loss: series::gain_loss_series(&records),
            daily: series::daily_summary(&records),
            fetched_at: set.fetched_at(),
            records,
        })
    }

    /// Drop the cached set and fetch it again.
    pub fn refresh(&self) -> Result<DataStatus, DashboardError> {
        self.cache.invalidate();
        tracing::info!(query = self.gateway.query_id(), "manual refresh");
        self.status()
    }

    pub fn status(&self) -> Result<DataStatus, DashboardError> {
        let set = self.records()?;
        Ok(DataStatus::from_result_set(&set))
    }
}
