//! Per-channel batching of accepted messages.
//!
//! Fragments are buffered by channel and flushed on a fixed interval, one
//! utterance per channel. Whatever is still buffered when the aggregator
//! stops is dropped: delivery is at most once.

use std::{collections::HashMap, time::Duration};

use {
    murmur_channels::{InboundMessage, MessageFilter, Pronunciation},
    murmur_config::UtteranceConfig,
    tokio::{
        sync::mpsc,
        time::{Instant, MissedTickBehavior},
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, info},
};

/// A message that passed the filter, with the names resolved at intake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedMessage {
    pub message: InboundMessage,
    pub channel_name: Option<String>,
    pub user_name: Option<String>,
}

/// One ready-to-speak unit: every fragment a channel produced in one interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    /// Channel identifier the fragments came from.
    pub channel: String,
    pub text: String,
}

pub struct Aggregator {
    channel_yomi: Pronunciation,
    user_yomi: Pronunciation,
    keyword_yomi: Pronunciation,
    format: UtteranceConfig,
    pending: HashMap<String, Vec<String>>,
}

impl Aggregator {
    #[must_use]
    pub fn new(
        channel_yomi: Pronunciation,
        user_yomi: Pronunciation,
        keyword_yomi: Pronunciation,
        format: UtteranceConfig,
    ) -> Self {
        Self {
            channel_yomi,
            user_yomi,
            keyword_yomi,
            format,
            pending: HashMap::new(),
        }
    }

    /// Take the pronunciation rules from the filter's conditions.
    #[must_use]
    pub fn from_filter(filter: &MessageFilter, format: UtteranceConfig) -> Self {
        Self::new(
            filter.channel.pronunciation().clone(),
            filter.user.pronunciation().clone(),
            filter.keyword.pronunciation().clone(),
            format,
        )
    }

    /// Render the spoken fragment for one message.
    ///
    /// Returns `None` when the body is empty.
    #[must_use]
    pub fn fragment(&self, accepted: &AcceptedMessage) -> Option<String> {
        let body = accepted.message.text.to_lowercase();
        if body.is_empty() {
            return None;
        }
        let body = self.keyword_yomi.apply(&body);
        let user = self.display_name(&self.user_yomi, accepted.user_name.as_deref());
        let channel = self.display_name(&self.channel_yomi, accepted.channel_name.as_deref());

        Some(format!(
            "{body}. {} {user}. {} {channel}",
            self.format.speaker_label, self.format.channel_label
        ))
    }

    fn display_name(&self, yomi: &Pronunciation, name: Option<&str>) -> String {
        let spoken = name.map(|n| yomi.apply(n).into_owned()).unwrap_or_default();
        if spoken.is_empty() {
            self.format.unknown.clone()
        } else {
            spoken
        }
    }

    /// Append a message to its channel's batch.
    pub fn push(&mut self, accepted: &AcceptedMessage) {
        let Some(fragment) = self.fragment(accepted) else {
            return;
        };
        debug!(channel = %accepted.message.channel, %fragment, "fragment queued");
        self.pending
            .entry(accepted.message.channel.clone())
            .or_default()
            .push(fragment);
    }

    /// Number of channels with buffered fragments.
    #[must_use]
    pub fn pending_channels(&self) -> usize {
        self.pending.len()
    }

    /// Drain every batch into one utterance per channel.
    ///
    /// Cross-channel order is unspecified.
    pub fn flush(&mut self) -> Vec<Utterance> {
        std::mem::take(&mut self.pending)
            .into_iter()
            .map(|(channel, fragments)| Utterance {
                channel,
                text: fragments.join(&self.format.separator),
            })
            .collect()
    }

    /// Batch until `inbound` closes or `cancel` fires, flushing every
    /// `interval` into `outbound`.
    ///
    /// Sending waits while `outbound` is full.
    pub async fn run(
        mut self,
        mut inbound: mpsc::Receiver<AcceptedMessage>,
        outbound: mpsc::Sender<Utterance>,
        interval: Duration,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        'run: loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break 'run,
                _ = ticker.tick() => {
                    let batch = self.flush();
                    if batch.is_empty() {
                        continue;
                    }
                    debug!(utterances = batch.len(), "flushing batches");
                    for utterance in batch {
                        tokio::select! {
                            biased;
                            () = cancel.cancelled() => break 'run,
                            sent = outbound.send(utterance) => {
                                if sent.is_err() {
                                    debug!("dispatcher queue closed");
                                    break 'run;
                                }
                            },
                        }
                    }
                },
                next = inbound.recv() => match next {
                    Some(accepted) => self.push(&accepted),
                    None => break 'run,
                },
            }
        }

        if !self.pending.is_empty() {
            info!(
                channels = self.pending.len(),
                "aggregator stopped, discarding unflushed batches"
            );
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn plain() -> Aggregator {
        Aggregator::new(
            Pronunciation::default(),
            Pronunciation::default(),
            Pronunciation::default(),
            UtteranceConfig::default(),
        )
    }

    fn accepted(channel: &str, channel_name: &str, user: &str, text: &str) -> AcceptedMessage {
        AcceptedMessage {
            message: InboundMessage::new(channel, format!("id-{user}"), text),
            channel_name: Some(channel_name.into()),
            user_name: Some(user.into()),
        }
    }

    #[rstest]
    #[case::resolved("Hello", Some("general"), Some("bob"), Some("hello. spoken by bob. channel general"))]
    #[case::unresolved("hi", None, None, Some("hi. spoken by unknown. channel unknown"))]
    #[case::empty_user_name("hi", Some("general"), Some(""), Some("hi. spoken by unknown. channel general"))]
    #[case::body_lowercased("DEPLOY Done", Some("ops"), Some("carol"), Some("deploy done. spoken by carol. channel ops"))]
    #[case::empty_body("", Some("general"), Some("bob"), None)]
    fn fragment_rendering(
        #[case] text: &str,
        #[case] channel_name: Option<&str>,
        #[case] user_name: Option<&str>,
        #[case] expected: Option<&str>,
    ) {
        let msg = AcceptedMessage {
            message: InboundMessage::new("C1", "U1", text),
            channel_name: channel_name.map(Into::into),
            user_name: user_name.map(Into::into),
        };
        assert_eq!(plain().fragment(&msg).as_deref(), expected);
    }

    #[test]
    fn pronunciations_apply_to_each_part() {
        let agg = Aggregator::new(
            Pronunciation::new(&["dev-ops", "devops"]).unwrap(),
            Pronunciation::new(&["bob_92", "bob"]).unwrap(),
            Pronunciation::new(&["k8s", "kubernetes"]).unwrap(),
            UtteranceConfig::default(),
        );
        let fragment = agg
            .fragment(&accepted("C1", "dev-ops", "bob_92", "K8S is down"))
            .unwrap();
        assert_eq!(fragment, "kubernetes is down. spoken by bob. channel devops");
    }

    #[test]
    fn localized_format() {
        let agg = Aggregator::new(
            Pronunciation::default(),
            Pronunciation::default(),
            Pronunciation::default(),
            UtteranceConfig {
                speaker_label: "発言者".into(),
                channel_label: "チャンネル".into(),
                separator: "。".into(),
                unknown: "不明".into(),
            },
        );
        let msg = AcceptedMessage {
            message: InboundMessage::new("C1", "U1", "おはよう"),
            channel_name: Some("雑談".into()),
            user_name: None,
        };
        assert_eq!(
            agg.fragment(&msg).unwrap(),
            "おはよう. 発言者 不明. チャンネル 雑談"
        );
    }

    #[test]
    fn empty_body_is_skipped() {
        let mut agg = plain();
        agg.push(&accepted("C1", "general", "bob", ""));
        assert_eq!(agg.pending_channels(), 0);
        assert!(agg.flush().is_empty());
    }

    #[test]
    fn flush_groups_by_channel_in_arrival_order() {
        let mut agg = plain();
        agg.push(&accepted("CA", "general", "bob", "hello"));
        agg.push(&accepted("CB", "random", "dave", "yo"));
        agg.push(&accepted("CA", "general", "carol", "bye"));

        let mut utterances = agg.flush();
        utterances.sort_by(|a, b| a.channel.cmp(&b.channel));
        assert_eq!(utterances, vec![
            Utterance {
                channel: "CA".into(),
                text: "hello. spoken by bob. channel general。bye. spoken by carol. channel general"
                    .into(),
            },
            Utterance {
                channel: "CB".into(),
                text: "yo. spoken by dave. channel random".into(),
            },
        ]);
        assert_eq!(agg.pending_channels(), 0);
        assert!(agg.flush().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn run_flushes_on_interval_and_idles_quietly() {
        let (in_tx, in_rx) = mpsc::channel(8);
        let (out_tx, mut out_rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(plain().run(
            in_rx,
            out_tx,
            Duration::from_secs(1),
            cancel.clone(),
        ));

        in_tx
            .send(accepted("C1", "general", "bob", "one"))
            .await
            .unwrap();
        in_tx
            .send(accepted("C1", "general", "bob", "two"))
            .await
            .unwrap();

        let first = out_rx.recv().await.unwrap();
        assert_eq!(
            first.text,
            "one. spoken by bob. channel general。two. spoken by bob. channel general"
        );

        // Several idle intervals produce nothing.
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(out_rx.try_recv().is_err());

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn closing_inbound_discards_unflushed_batch() {
        let (in_tx, in_rx) = mpsc::channel(8);
        let (out_tx, mut out_rx) = mpsc::channel(8);
        let task = tokio::spawn(plain().run(
            in_rx,
            out_tx,
            Duration::from_secs(3_600),
            CancellationToken::new(),
        ));

        in_tx
            .send(accepted("C1", "general", "bob", "lost"))
            .await
            .unwrap();
        drop(in_tx);
        task.await.unwrap();

        // At-most-once: the buffered fragment is never flushed.
        assert!(out_rx.recv().await.is_none());
    }
}
