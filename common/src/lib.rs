// Common library for the work ledger: storage, analytics, export and import

pub mod analytics;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod export;
pub mod import;
pub mod models;
pub mod slug;
pub mod telemetry;
