use thiserror::Error;

use crate::validate::ValidationResult;

#[derive(Debug, Error)]
pub enum Error {
    /// The document is not valid JSON for the schema.
    #[error("malformed config document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid duration {input:?}: {reason}")]
    InvalidDuration { input: String, reason: String },

    /// One or more validation diagnostics of error severity.
    #[error("invalid configuration:\n{report}")]
    Invalid { report: String },

    /// An I/O or lookup failure with its context attached.
    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn invalid_duration(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDuration {
            input: input.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn invalid(result: &ValidationResult) -> Self {
        Self::Invalid {
            report: result.to_string(),
        }
    }
}

impl murmur_common::FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

murmur_common::impl_context!();
