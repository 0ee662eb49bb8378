use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::CardId;

pub type Result<T> = std::result::Result<T, CardsError>;

#[derive(Debug, Error)]
pub enum CardsError {
    #[error("Card not found: {0}")]
    CardNotFound(CardId),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid {kind} value: {value}")]
    InvalidEnumValue { kind: &'static str, value: String },

    #[error("Bad dates provided, highest_create_date ({highest}) must be after lowest_create_date ({lowest})")]
    InvalidRange {
        lowest: NaiveDate,
        highest: NaiveDate,
    },

    #[error("Invalid card ID format: {0}")]
    InvalidCardId(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

#[cfg(feature = "sqlite-storage")]
impl From<rusqlite::Error> for CardsError {
    fn from(err: rusqlite::Error) -> Self {
        Self::StorageError(err.to_string())
    }
}
