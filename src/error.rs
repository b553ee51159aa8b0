use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Nothing to study right now")]
    NothingToStudy,

    #[error("Need at least {needed} cards in the study queue, found {found}")]
    NotEnoughCards { needed: usize, found: usize },

    #[error("Not enough sparks: need {needed}, have {available}")]
    InsufficientFunds { needed: u32, available: u32 },

    #[error("Contract violation: {0}")]
    ContractViolation(String),

    #[error("Card {0} not found")]
    CardNotFound(i64),

    #[error("Collection {0} not found")]
    CollectionNotFound(i64),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// "Nothing to do" conditions that leave all state untouched.
    pub fn is_non_fatal(&self) -> bool {
        matches!(
            self,
            AppError::NothingToStudy
                | AppError::NotEnoughCards { .. }
                | AppError::InsufficientFunds { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
