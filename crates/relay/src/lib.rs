//! The relay pipeline: intake → aggregator → dispatcher.
//!
//! Each stage is its own task. Stages talk through bounded queues and share
//! one [`CancellationToken`](tokio_util::sync::CancellationToken) for
//! shutdown.

pub mod aggregator;
pub mod dispatcher;
pub mod error;
pub mod pipeline;

pub use {
    aggregator::{AcceptedMessage, Aggregator, Utterance},
    dispatcher::{DispatchStats, Dispatcher},
    error::{Error, Result},
    pipeline::{MESSAGE_QUEUE_SIZE, Relay, RelayHandle, RelayReport, SPEECH_QUEUE_SIZE},
};
