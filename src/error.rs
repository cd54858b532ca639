//! Error types.
//!
//! `AppError` is the fatal path: it carries the process exit code and ends the
//! run. `FetchError` is the recoverable, per-pair path: the pipeline logs it,
//! records it in the run summary and moves on to the next indicator.

use thiserror::Error;

/// Invalid flags, unreadable or invalid catalogs.
pub const EXIT_CONFIG: u8 = 2;
/// Output directory or file could not be written.
pub const EXIT_IO: u8 = 3;
/// The remote source returned something the run cannot continue past.
pub const EXIT_REMOTE: u8 = 4;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(EXIT_CONFIG, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(EXIT_IO, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Why a single (country, indicator) fetch produced no table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("request failed with status {0}")]
    Status(u16),
    #[error("response body is not valid JSON: {0}")]
    Malformed(String),
}

impl FetchError {
    pub fn is_malformed(&self) -> bool {
        matches!(self, FetchError::Malformed(_))
    }
}
