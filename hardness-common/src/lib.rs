//! # Soil Hardness Common Library
//!
//! Shared code for the soil hardness workspace including:
//! - Database schema creation and row models
//! - Configuration loading and root folder resolution
//! - Acquisition timezone helpers
//! - Common error type

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
