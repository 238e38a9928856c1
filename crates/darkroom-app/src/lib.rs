//! Operator HTTP surface and background workers of the studio.

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod studio_handler;
pub mod worker;
