//! Error types for loading crafting data and computing shopping lists

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CraftError {
    #[error("crafting data unavailable from {source_name}: {reason}")]
    DataUnavailable { source_name: String, reason: String },

    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("no item at path '{0}'")]
    UnknownNode(String),

    #[error("unknown game '{0}'")]
    UnknownDataset(String),

    #[error("unknown specialisation '{group}' for game '{dataset}'")]
    UnknownGroup { dataset: String, group: String },

    #[error("no game selected, run 'select <game>' first")]
    NoDatasetSelected,

    #[error("selection store failed: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl CraftError {
    pub(crate) fn unavailable(source_name: impl Into<String>, reason: impl ToString) -> Self {
        CraftError::DataUnavailable {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }
}

pub type CraftResult<T> = Result<T, CraftError>;
