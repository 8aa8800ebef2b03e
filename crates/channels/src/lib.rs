//! Inbound side of the relay.
//!
//! A [`MessageSource`] yields [`InboundMessage`]s and exposes a
//! [`NameDirectory`] for display names. [`gating::MessageFilter`] decides which
//! messages are spoken and [`pronunciation::Pronunciation`] rewrites text
//! before it reaches the speech command.

pub mod error;
pub mod gating;
pub mod message;
pub mod pronunciation;
pub mod source;

pub use {
    error::{Error, Result},
    gating::{Condition, MessageFilter},
    message::{BOT_MESSAGE_SUBTYPE, InboundMessage},
    pronunciation::Pronunciation,
    source::{MessageSource, NameDirectory, NameTable, QueueSource},
};
