// src/models/mod.rs
// DOCUMENTATION: Models module organization
// PURPOSE: Re-export photo model components

pub mod photo;

pub use photo::*;
