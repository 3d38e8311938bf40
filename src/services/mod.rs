// src/services/mod.rs
// DOCUMENTATION: Services module organization
// PURPOSE: Re-export media service components

pub mod cache;
pub mod media_orchestrator;
pub mod providers;
pub mod storage;

#[cfg(test)]
pub mod testing;

pub use cache::*;
pub use media_orchestrator::*;
pub use storage::*;
