//! Text-to-speech output abstraction and the external-command implementation.

mod command;

pub use command::CommandSpeaker;

use {async_trait::async_trait, tokio_util::sync::CancellationToken};

use crate::error::SpeechError;

/// Something that can speak one utterance at a time.
#[async_trait]
pub trait Speaker: Send + Sync {
    /// Identifier used in logs (the command name for [`CommandSpeaker`]).
    fn id(&self) -> &str;

    /// Speak `text`, returning once output has finished.
    ///
    /// Implementations must stop promptly when `cancel` fires and report
    /// [`SpeechError::Cancelled`].
    async fn speak(&self, text: &str, cancel: &CancellationToken) -> Result<(), SpeechError>;
}
