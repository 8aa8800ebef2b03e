//! Wiring of the three relay tasks.

use std::{sync::Arc, time::Duration};

use {
    murmur_channels::{InboundMessage, MessageFilter, MessageSource, NameDirectory},
    murmur_config::{MurmurConfig, UtteranceConfig},
    murmur_voice::{CommandSpeaker, Speaker},
    tokio::{sync::mpsc, task::JoinHandle},
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::{
    aggregator::{AcceptedMessage, Aggregator},
    dispatcher::{DispatchStats, Dispatcher},
    error::{Error, Result},
};

/// Capacity of the intake → aggregator queue.
pub const MESSAGE_QUEUE_SIZE: usize = 128;
/// Capacity of the aggregator → dispatcher queue.
pub const SPEECH_QUEUE_SIZE: usize = 128;

/// A configured, not yet running pipeline.
pub struct Relay {
    filter: MessageFilter,
    speaker: Arc<dyn Speaker>,
    format: UtteranceConfig,
    flush_interval: Duration,
}

/// What the pipeline did before it stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayReport {
    pub dispatch: DispatchStats,
}

impl Relay {
    #[must_use]
    pub fn new(
        filter: MessageFilter,
        speaker: Arc<dyn Speaker>,
        format: UtteranceConfig,
        flush_interval: Duration,
    ) -> Self {
        Self {
            filter,
            speaker,
            format,
            flush_interval,
        }
    }

    /// Build the filter and the external-command speaker from `config`.
    pub fn from_config(config: &MurmurConfig) -> Result<Self> {
        let filter = MessageFilter::from_config(config)?;
        let speaker: Arc<dyn Speaker> = Arc::new(CommandSpeaker::from_config(config)?);
        Ok(Self::new(
            filter,
            speaker,
            config.utterance.clone(),
            config.flush_interval()?,
        ))
    }

    /// Spawn intake, aggregator and dispatcher tasks reading from `source`.
    ///
    /// Firing `cancel` stops every stage and kills any speech in flight.
    pub fn start<S>(self, source: S, cancel: CancellationToken) -> RelayHandle
    where
        S: MessageSource + 'static,
    {
        let (accepted_tx, accepted_rx) = mpsc::channel(MESSAGE_QUEUE_SIZE);
        let (speech_tx, speech_rx) = mpsc::channel(SPEECH_QUEUE_SIZE);

        let aggregator = Aggregator::from_filter(&self.filter, self.format);
        let aggregator = tokio::spawn(aggregator.run(
            accepted_rx,
            speech_tx,
            self.flush_interval,
            cancel.clone(),
        ));

        info!(
            speaker = self.speaker.id(),
            flush_interval = ?self.flush_interval,
            "relay started"
        );
        let dispatcher = tokio::spawn(Dispatcher::new(self.speaker).run(speech_rx, cancel.clone()));

        let intake = Intake {
            filter: self.filter,
            directory: source.directory(),
            outbound: accepted_tx,
        };
        let intake = tokio::spawn(intake.run(source, cancel.clone()));

        RelayHandle {
            cancel,
            intake,
            aggregator,
            dispatcher,
        }
    }
}

struct Intake {
    filter: MessageFilter,
    directory: Arc<dyn NameDirectory>,
    outbound: mpsc::Sender<AcceptedMessage>,
}

impl Intake {
    async fn run<S: MessageSource>(self, mut source: S, cancel: CancellationToken) -> Result<()> {
        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(()),
                next = source.next_message() => next?,
            };
            let Some(message) = next else {
                debug!("message source ended");
                return Ok(());
            };
            let Some(accepted) = self.admit(message) else {
                continue;
            };
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(()),
                sent = self.outbound.send(accepted) => {
                    if sent.is_err() {
                        return Ok(());
                    }
                },
            }
        }
    }

    /// Resolve names and apply the filter.
    fn admit(&self, message: InboundMessage) -> Option<AcceptedMessage> {
        if message.text.is_empty() {
            return None;
        }
        let channel_name = self.directory.channel_name(&message.channel);
        let user_name = self.directory.user_name(&message.user_id);

        if !self
            .filter
            .accept(&message, channel_name.as_deref(), user_name.as_deref())
        {
            debug!(
                channel = %message.channel,
                user = %message.user_id,
                "message filtered out"
            );
            return None;
        }
        Some(AcceptedMessage {
            message,
            channel_name,
            user_name,
        })
    }
}

/// Handle to a running pipeline.
pub struct RelayHandle {
    cancel: CancellationToken,
    intake: JoinHandle<Result<()>>,
    aggregator: JoinHandle<()>,
    dispatcher: JoinHandle<DispatchStats>,
}

impl RelayHandle {
    #[must_use]
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Wait for the pipeline to stop.
    ///
    /// When the source ends cleanly the remaining stages drain on their own.
    /// A source error cancels the other stages and is returned once they
    /// have stopped.
    pub async fn join(self) -> Result<RelayReport> {
        let intake = match self.intake.await {
            Ok(result) => result,
            Err(source) => Err(Error::Task {
                task: "intake",
                source,
            }),
        };
        if let Err(e) = &intake {
            warn!(error = %e, "intake stopped, shutting down relay");
            self.cancel.cancel();
        }

        self.aggregator.await.map_err(|source| Error::Task {
            task: "aggregator",
            source,
        })?;
        let dispatch = self.dispatcher.await.map_err(|source| Error::Task {
            task: "dispatcher",
            source,
        })?;

        intake.map(|()| RelayReport { dispatch })
    }

    /// Cancel every stage and wait for them, killing any speech in flight.
    pub async fn shutdown(self) -> Result<RelayReport> {
        self.cancel.cancel();
        self.join().await
    }
}
