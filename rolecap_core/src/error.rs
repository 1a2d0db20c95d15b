use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CapabilityError>;

/// Failures reported by a role store backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Lock error: {0}")]
    LockPoisoned(String),

    #[error("Role store error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
