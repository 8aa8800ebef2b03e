use slack_morphism::errors::SlackClientError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The HTTPS connector could not be built (usually missing root certificates).
    #[error("failed to create slack http connector: {0}")]
    Connector(String),

    #[error("slack api call {method} failed: {source}")]
    Api {
        method: &'static str,
        #[source]
        source: SlackClientError,
    },

    #[error("slack socket mode listener failed: {0}")]
    Listener(#[source] SlackClientError),
}

impl Error {
    pub(crate) fn api(method: &'static str) -> impl FnOnce(SlackClientError) -> Self {
        move |source| Self::Api { method, source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
