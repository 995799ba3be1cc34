use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{entity} is missing required field '{field}'")]
    MissingField {
        entity: &'static str,
        field:  &'static str,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Snapshot '{id}' not found")]
    SnapshotNotFound { id: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoreError {
    /// True for errors caused by a malformed or incomplete record.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::MissingField { .. } | Self::InvalidInput(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
