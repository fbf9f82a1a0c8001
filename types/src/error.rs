//! Errors raised when parsing fundamental types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TypesError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid hex in {field}: expected {expected} hex chars")]
    InvalidHex { field: &'static str, expected: usize },

    #[error("invalid amount: {0}")]
    InvalidAmount(f64),
}
