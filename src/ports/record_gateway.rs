//! Record store gateway port.

use crate::domain::error::StoreError;
use crate::domain::transaction::TransactionRecord;

/// Canonical text of a gateway's query: SQL for database stores, the file
/// path for CSV.
pub type QueryId = String;

/// Reads the full transaction set from a backing store.
///
/// `fetch` returns every valid row ordered by date descending, or an error
/// with no partial data.
pub trait RecordGateway: Send + Sync {
    /// Stable identity of the query this gateway runs. Two gateways with the
    /// same identity return the same data.
    fn query_id(&self) -> &str;

    fn fetch(&self) -> Result<Vec<TransactionRecord>, StoreError>;
}
