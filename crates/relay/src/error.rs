use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] murmur_config::Error),

    #[error(transparent)]
    Channels(#[from] murmur_channels::Error),

    /// A pipeline task panicked or was aborted.
    #[error("relay task {task} did not finish cleanly: {source}")]
    Task {
        task: &'static str,
        #[source]
        source: tokio::task::JoinError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
