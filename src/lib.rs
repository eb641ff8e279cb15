pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod metrics;

// Use cases and the ports they depend on
pub mod app;
// Adapters for the ports: AWS, Notify
pub mod infra;
