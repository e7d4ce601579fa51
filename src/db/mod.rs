//! Database layer
//!
//! Supports two backends behind one `DatabasePool` trait:
//! - SQLite (default, single file next to the binary)
//! - MySQL
//!
//! The driver is selected from `DatabaseConfig::driver`.
//!
//! # Usage
//!
//! ```ignore
//! use larder::config::DatabaseConfig;
//! use larder::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;
pub mod seed;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
