//! hardness-core library interface
//!
//! Exposes the pipeline services for the CLI and for integration testing

pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{AssociationError, ImportError, IngestError, PlotError};
