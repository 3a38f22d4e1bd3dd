//! Core domain types and logic.

pub mod transaction;
pub mod filter;
pub mod kpi;
pub mod series;
pub mod instrument;
pub mod query;
pub mod cache;
pub mod dashboard;
pub mod config_validation;
pub mod error;
