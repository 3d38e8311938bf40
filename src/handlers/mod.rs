// src/handlers/mod.rs
// DOCUMENTATION: Handlers module organization
// PURPOSE: Re-export route configuration for each handler group

pub mod admin;
pub mod health;
pub mod media;

pub use admin::config as admin_config;
pub use health::config as health_config;
pub use media::config as media_config;
