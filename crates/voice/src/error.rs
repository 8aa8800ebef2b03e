use std::{process::ExitStatus, time::Duration};

/// Why one speech job did not complete.
///
/// Every variant is scoped to a single job; none of them stops the relay
/// except [`SpeechError::Cancelled`], which only occurs during shutdown.
#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    /// The configured executable is not on `$PATH`.
    #[error("command {command} is not installed in your $PATH")]
    NotInstalled { command: String },

    /// The process outlived its deadline and was killed.
    #[error("{command} command timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    /// Shutdown arrived mid-job; the process was killed.
    #[error("{command} command cancelled")]
    Cancelled { command: String },

    /// The process ran but exited unsuccessfully.
    #[error("{command} exited with {status}")]
    Failed { command: String, status: ExitStatus },

    /// Spawning, streaming input or waiting failed.
    #[error("{command} {stage} failed: {source}")]
    Io {
        command: String,
        stage: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl SpeechError {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
