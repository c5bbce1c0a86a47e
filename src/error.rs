use std::path::PathBuf;

use thiserror::Error;

use crate::models::ValidationError;

pub type Result<T, E = JumpListError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum JumpListError {
    /// Bad caller input: missing directory, unusable bound, tool not found.
    #[error("invalid input: {0}")]
    Input(String),

    #[error("JumpList directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    /// The external parser failed, produced nothing, or ran out of time.
    #[error("collaborator failed: {0}")]
    Collaborator(String),

    /// A cache transaction failed and was rolled back.
    #[error("cache store error: {0}")]
    Store(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl JumpListError {
    pub(crate) fn store(err: anyhow::Error) -> Self {
        JumpListError::Store(format!("{err:#}"))
    }

    pub fn is_input(&self) -> bool {
        matches!(
            self,
            JumpListError::Input(_) | JumpListError::DirectoryNotFound(_)
        )
    }
}
