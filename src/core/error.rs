use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocdriftError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Path error: {0}")]
    PathError(String),
    #[error("Config error: {0}")]
    ConfigError(String),
    #[error("Session lock timed out: {0}")]
    LockTimeout(String),
    #[error("Fix apply failed: {0}")]
    FixApplyError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
}
