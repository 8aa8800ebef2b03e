/// Crate-wide result type for inbound operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A pronunciation list did not split into find/replace pairs.
    #[error("pronunciation list has an odd number of entries ({len}); expected find/replace pairs")]
    UnpairedPronunciation { len: usize },

    #[error("invalid pronunciation pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// A condition for one dimension (channel, user, keyword) is invalid.
    #[error("invalid {dimension} condition: {source}")]
    Condition {
        dimension: &'static str,
        #[source]
        source: Box<Error>,
    },

    /// The message source lost its upstream connection.
    #[error("message source disconnected: {reason}")]
    Disconnected { reason: String },
}

impl Error {
    #[must_use]
    pub fn disconnected(reason: impl std::fmt::Display) -> Self {
        Self::Disconnected {
            reason: reason.to_string(),
        }
    }

    pub(crate) fn condition(dimension: &'static str, source: Error) -> Self {
        Self::Condition {
            dimension,
            source: Box::new(source),
        }
    }
}
