// src/db/mod.rs
// DOCUMENTATION: Database module organization
// PURPOSE: Postgres implementation of the photo cache port

pub mod photo_repository;

pub use photo_repository::*;
