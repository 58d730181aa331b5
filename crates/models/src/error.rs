//! Error taxonomy shared by the builders and the serving path.

use data_loader::DataLoadError;
use thiserror::Error;

/// Errors raised while building, loading or querying model artifacts.
#[derive(Error, Debug)]
pub enum ModelError {
    /// Query identifier absent from the catalog
    #[error("Not found: {0}")]
    NotFound(String),

    /// Row-position or index-bounds mismatch between aligned artifacts
    #[error("Alignment error: {0}")]
    Alignment(String),

    /// Empty or degenerate input to a builder or the evaluator
    #[error("Data error: {0}")]
    Data(String),

    /// An external id has no dense index in the factor model
    #[error("Unmapped {kind} id {id}")]
    Unmapped { kind: IdKind, id: u32 },

    /// An optional artifact the operation needs was not built or loaded
    #[error("Missing artifact: {0}")]
    MissingArtifact(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to load data: {0}")]
    Load(#[from] DataLoadError),
}

/// Which id map an unmapped id was looked up in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    User,
    Item,
}

impl std::fmt::Display for IdKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdKind::User => write!(f, "user"),
            IdKind::Item => write!(f, "item"),
        }
    }
}

/// Taxonomy bucket of an error, used by the serving layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Alignment,
    Data,
    Unmapped,
    Internal,
}

impl ModelError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ModelError::NotFound(_) => ErrorKind::NotFound,
            ModelError::Alignment(_) => ErrorKind::Alignment,
            ModelError::Data(_) => ErrorKind::Data,
            ModelError::Unmapped { .. } => ErrorKind::Unmapped,
            ModelError::MissingArtifact(_)
            | ModelError::Io(_)
            | ModelError::Serialization(_)
            | ModelError::Load(_) => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;
