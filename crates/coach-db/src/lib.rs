//! Storage layer: connection config, pool and migrations, row models and
//! the SQL for every table.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
