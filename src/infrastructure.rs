//! Infrastructure layer - SQLite persistence, HTTP client, media vault,
//! configuration and logging

pub mod ad_repository;
pub mod config;
pub mod csv_loader;
pub mod database_connection;
pub mod http_client;
pub mod logging;
pub mod media_vault;
