//! Configuration validation.
//!
//! Validates store and cache settings before any store access.

use crate::domain::cache::DEFAULT_TTL_SECS;
use crate::domain::error::DashboardError;
use crate::ports::config_port::ConfigPort;
use chrono::TimeDelta;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Sqlite,
    Postgres,
    Csv,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(Backend::Sqlite),
            "postgres" | "postgresql" => Ok(Backend::Postgres),
            "csv" => Ok(Backend::Csv),
            other => Err(format!(
                "unknown backend '{other}' (expected sqlite, postgres or csv)"
            )),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Backend::Sqlite => "sqlite",
            Backend::Postgres => "postgres",
            Backend::Csv => "csv",
        })
    }
}

pub fn backend(config: &dyn ConfigPort) -> Result<Backend, DashboardError> {
    config
        .get_string_or("store", "backend", "sqlite")
        .parse()
        .map_err(|reason| DashboardError::ConfigInvalid {
            section: "store".to_string(),
            key: "backend".to_string(),
            reason,
        })
}

/// `[cache] ttl_seconds` as a duration. Must be positive and representable.
pub fn cache_ttl(config: &dyn ConfigPort) -> Result<TimeDelta, DashboardError> {
    let value = config.get_int("cache", "ttl_seconds", DEFAULT_TTL_SECS);
    let invalid = |reason: &str| DashboardError::ConfigInvalid {
        section: "cache".to_string(),
        key: "ttl_seconds".to_string(),
        reason: reason.to_string(),
    };
    if value <= 0 {
        return Err(invalid("ttl_seconds must be positive"));
    }
    TimeDelta::try_seconds(value).ok_or_else(|| invalid("ttl_seconds is out of range"))
}

/// `pool_size` of a store section, between 1 and `u32::MAX` (default 4).
pub fn pool_size(config: &dyn ConfigPort, section: &str) -> Result<u32, DashboardError> {
    let value = config.get_int(section, "pool_size", 4);
    match u32::try_from(value) {
        Ok(size) if size >= 1 => Ok(size),
        _ => Err(DashboardError::ConfigInvalid {
            section: section.to_string(),
            key: "pool_size".to_string(),
            reason: format!("pool_size must be between 1 and {}, got {value}", u32::MAX),
        }),
    }
}

pub fn validate_store_config(config: &dyn ConfigPort) -> Result<(), DashboardError> {
    match backend(config)? {
        Backend::Sqlite => require(config, "sqlite", "path")?,
        Backend::Csv => require(config, "csv", "path")?,
        Backend::Postgres => validate_postgres(config)?,
    }
    for section in ["sqlite", "postgres"] {
        pool_size(config, section)?;
    }
    cache_ttl(config)?;
    Ok(())
}

fn require(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), DashboardError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(DashboardError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

fn validate_postgres(config: &dyn ConfigPort) -> Result<(), DashboardError> {
    let primary = config.get_string("postgres", "connection_string");
    let fallback = config.get_string("database", "conninfo");

    match (primary, fallback) {
        (Some(c), _) if !c.trim().is_empty() => Ok(()),
        (_, Some(c)) if !c.trim().is_empty() => Ok(()),
        _ => Err(DashboardError::ConfigMissing {
            section: "database".to_string(),
            key: "conninfo".to_string(),
        }),
    }
}
