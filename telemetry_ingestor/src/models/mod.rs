pub mod statistics;
pub mod status;
