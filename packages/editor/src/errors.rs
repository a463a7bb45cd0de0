//! Error types for the editor

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Document error: {0}")]
    Model(#[from] compose_model::ModelError),

    #[error("Command error: {0}")]
    Command(#[from] crate::commands::CommandError),

    #[error("Binder error: {0}")]
    Binder(#[from] crate::conditions::BinderError),

    #[error("Validation error: {0}")]
    Validation(#[from] crate::validate::ValidationError),

    #[error("{0}")]
    Sink(#[from] crate::payload::SinkError),
}
