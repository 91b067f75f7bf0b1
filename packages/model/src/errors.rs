//! Error types for the note model

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Malformed fragment #{index} ({tag}): {detail}")]
    MalformedFragment {
        index: usize,
        tag: String,
        detail: String,
    },

    #[error("Malformed timestamp: {0:?}")]
    MalformedTimestamp(String),
}

impl ModelError {
    pub(crate) fn malformed(index: usize, tag: impl Into<String>, detail: impl Into<String>) -> Self {
        ModelError::MalformedFragment {
            index,
            tag: tag.into(),
            detail: detail.into(),
        }
    }
}
