//! Errors shared by the store, config and time helpers

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Root folder or database directory could not be created
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unreadable or malformed bootstrap TOML
    #[error("Configuration error: {0}")]
    Config(String),

    /// Device header or stored timestamp that does not parse
    #[error("Timestamp error: {0}")]
    Timestamp(String),
}
