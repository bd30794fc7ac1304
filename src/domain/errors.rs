use std::collections::BTreeMap;

use thiserror::Error;

/// Field name → human readable message, reported inline next to the field.
pub type FieldErrors = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found")]
    NotFound,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Validation failed")]
    Validation(FieldErrors),
    #[error("Cart is empty")]
    EmptyCart,
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment provider unreachable: {0}")]
    Transport(String),
    #[error("payment provider rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("invalid payment amount: {0}")]
    InvalidAmount(String),
    #[error("malformed provider response: {0}")]
    Decode(String),
}
