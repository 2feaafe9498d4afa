//! Small helpers shared by the ingestor and sync crates.

pub mod env;
