use crate::node::Path;
use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Invalid document JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No node at path {0:?}")]
    InvalidPath(Path),

    #[error("Node at path {0:?} is not a text node")]
    NotText(Path),

    #[error("Offset {offset} is out of range for text at {path:?} (length {len})")]
    OffsetOutOfRange { path: Path, offset: usize, len: usize },
}
