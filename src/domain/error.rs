//! Domain error types.

/// Failure reported by a record store gateway.
///
/// Cloneable so that a single failed fetch can be handed to every caller
/// that was waiting on it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("query error: {reason}")]
    Query { reason: String },
}

/// A store row that could not be turned into a transaction record.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("row {row} rejected: {reason}")]
pub struct RowRejected {
    pub row: usize,
    pub reason: String,
}

/// Top-level error type for commodash.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("export failed: {reason}")]
    Export { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DashboardError {
    /// Process exit status for this error.
    pub fn exit_status(&self) -> u8 {
        match self {
            DashboardError::Io(_) => 1,
            DashboardError::ConfigParse { .. }
            | DashboardError::ConfigMissing { .. }
            | DashboardError::ConfigInvalid { .. } => 2,
            DashboardError::Store(StoreError::Unavailable { .. }) => 3,
            DashboardError::Store(StoreError::Query { .. }) => 4,
            DashboardError::Export { .. } => 5,
        }
    }
}

impl From<&DashboardError> for std::process::ExitCode {
    fn from(err: &DashboardError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}
