// src/config/mod.rs
// DOCUMENTATION: Configuration module organization
// PURPOSE: Environment settings plus the optional Postgres pool for the photo cache

pub mod db;
pub mod env;

pub use db::init_db_pool;
pub use env::Config;
