//! Cruise and casino record desk.
//!
//! An in-process record store with debounced JSON persistence,
//! snapshot/rollback around risky mutations, a reconciliation pass that
//! repairs imported data, and an analytics layer (casino ROI, value score,
//! forecasting) that reads the store.

pub mod casino_analytics;
pub mod clock;
pub mod config;
pub mod error;
pub mod import;
pub mod model;
pub mod paytable;
pub mod persistence;
pub mod predictive;
pub mod reconcile;
pub mod rng;
pub mod snapshot;
pub mod store;
pub mod types;
pub mod value_score;
