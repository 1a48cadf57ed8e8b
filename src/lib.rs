//! Athlete jump/cut telemetry: classification, filtering, aggregation and
//! synthetic event generation over snapshots read from a Postgres store.

pub mod classify;
pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod generator;
pub mod metrics;
pub mod models;
pub mod report;
pub mod roster;
pub mod snapshot;
pub mod timestamp;
