pub mod errors;
pub mod models;
pub mod providers;
pub mod rate_limit;
pub mod retry;
pub mod transport;

pub use errors::Error;
