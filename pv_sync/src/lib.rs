//! Incremental sync of per-day PV telemetry into a local SQLite store.
//!
//! Repeated runs never re-fetch a (system, day) that is already cached as
//! data or recorded as authoritatively missing.

#![deny(missing_docs)]

pub mod availability;
pub mod config;
pub mod daterange;
pub mod dates;
pub mod db;
pub mod gaps;
pub mod schema;
pub mod store;
pub mod sync;
