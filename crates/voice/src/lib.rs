//! Speech output for murmur.
//!
//! [`Speaker`] is the seam the dispatcher talks to; [`CommandSpeaker`] runs
//! an external text-to-speech executable (`say`, `espeak`, ...) per
//! utterance, feeding the text on stdin.

pub mod error;
pub mod tts;

pub use {
    error::SpeechError,
    tts::{CommandSpeaker, Speaker},
};
