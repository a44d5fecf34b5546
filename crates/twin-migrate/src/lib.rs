#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod export;
pub mod migrate;
pub mod models;
pub mod projection;
pub mod sqlite;
pub mod store;
pub mod upsert;
pub mod utils;

pub use cli::app::{Cli, Command};
pub use migrate::{MigrationSummary, migrate};
