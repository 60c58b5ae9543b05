//! Component I: Executor.

pub mod executor;

pub use executor::{ExecuteRequest, OrderExecutor};
