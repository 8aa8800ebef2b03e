use std::sync::Arc;

use {
    murmur_voice::{Speaker, SpeechError},
    tokio::sync::mpsc,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::aggregator::Utterance;

/// Per-outcome counters for one dispatcher run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub spoken: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub not_installed: u64,
    pub cancelled: u64,
}

impl DispatchStats {
    fn record(&mut self, outcome: &Result<(), SpeechError>) {
        match outcome {
            Ok(()) => self.spoken += 1,
            Err(SpeechError::Timeout { .. }) => self.timed_out += 1,
            Err(SpeechError::NotInstalled { .. }) => self.not_installed += 1,
            Err(SpeechError::Cancelled { .. }) => self.cancelled += 1,
            Err(SpeechError::Failed { .. } | SpeechError::Io { .. }) => self.failed += 1,
        }
    }
}

/// Speaks utterances strictly one after another, in arrival order.
#[derive(Clone)]
pub struct Dispatcher {
    speaker: Arc<dyn Speaker>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(speaker: Arc<dyn Speaker>) -> Self {
        Self { speaker }
    }

    /// Run one speech job to completion, timeout or cancellation.
    pub async fn dispatch(
        &self,
        utterance: &Utterance,
        cancel: &CancellationToken,
    ) -> Result<(), SpeechError> {
        debug!(
            speaker = self.speaker.id(),
            channel = %utterance.channel,
            text = %utterance.text,
            "speaking"
        );
        self.speaker.speak(&utterance.text, cancel).await
    }

    /// Drain `queue` until it closes or `cancel` fires.
    ///
    /// A failed job is logged and the next one starts; only cancellation
    /// ends the loop early.
    pub async fn run(
        self,
        mut queue: mpsc::Receiver<Utterance>,
        cancel: CancellationToken,
    ) -> DispatchStats {
        let mut stats = DispatchStats::default();
        loop {
            let utterance = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                next = queue.recv() => match next {
                    Some(utterance) => utterance,
                    None => break,
                },
            };

            let outcome = self.dispatch(&utterance, &cancel).await;
            stats.record(&outcome);
            match outcome {
                Ok(()) => debug!(channel = %utterance.channel, "utterance spoken"),
                Err(e) if e.is_cancelled() => {
                    info!(channel = %utterance.channel, "speech interrupted by shutdown");
                    break;
                },
                Err(e) => warn!(channel = %utterance.channel, error = %e, "speech failed"),
            }
        }
        info!(?stats, "dispatcher stopped");
        stats
    }
}
