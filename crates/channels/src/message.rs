/// Subtype the chat service attaches to automated posts.
pub const BOT_MESSAGE_SUBTYPE: &str = "bot_message";

/// A message observed on the chat service, as handed to the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Channel identifier (not the display name).
    pub channel: String,
    /// Sender identifier (not the display name).
    pub user_id: String,
    pub text: String,
    pub subtype: Option<String>,
}

impl InboundMessage {
    #[must_use]
    pub fn new(
        channel: impl Into<String>,
        user_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            user_id: user_id.into(),
            text: text.into(),
            subtype: None,
        }
    }

    #[must_use]
    pub fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = Some(subtype.into());
        self
    }

    /// Whether this is an automated post.
    #[must_use]
    pub fn is_bot_message(&self) -> bool {
        self.subtype.as_deref() == Some(BOT_MESSAGE_SUBTYPE)
    }
}
