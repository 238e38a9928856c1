pub mod actor;
pub mod config;
pub mod constants;
pub mod error;
pub mod schedule;
pub mod types;
pub mod workflow;
