//! Socket Mode listener that feeds Slack message events to the relay.

use std::sync::Arc;

use {
    async_trait::async_trait,
    murmur_channels::{InboundMessage, MessageSource, NameDirectory, NameTable},
    slack_morphism::prelude::*,
    tokio::sync::mpsc,
    tokio_util::sync::{CancellationToken, DropGuard},
    tracing::{debug, info},
};

use crate::{
    config::SlackConfig,
    directory,
    error::{Error, Result},
};

/// Events buffered between the listener callback and the relay intake.
pub const EVENT_QUEUE_SIZE: usize = 128;

/// Shared state for socket mode callbacks.
struct ListenerState {
    events: mpsc::Sender<InboundMessage>,
}

/// A live Socket Mode connection.
///
/// Dropping the source stops the listener and the name refresh task.
pub struct SlackSource {
    events: mpsc::Receiver<InboundMessage>,
    names: NameTable,
    _stop: DropGuard,
}

impl SlackSource {
    /// Authenticate, load the name tables and open the Socket Mode connection.
    ///
    /// Background tasks stop when `cancel` fires or the source is dropped.
    pub async fn connect(config: &SlackConfig, cancel: &CancellationToken) -> Result<Self> {
        let connector =
            SlackClientHyperConnector::new().map_err(|e| Error::Connector(e.to_string()))?;
        let client = Arc::new(SlackClient::new(connector));

        let bot_token = config.bot_api_token();
        let auth_test = client
            .open_session(&bot_token)
            .auth_test()
            .await
            .map_err(Error::api("auth.test"))?;
        info!(
            bot_user = %auth_test.user_id,
            team = ?auth_test.team,
            "slack bot authenticated"
        );

        let names = NameTable::new();
        directory::refresh(&client, &bot_token, &names).await?;

        let (tx, rx) = mpsc::channel(EVENT_QUEUE_SIZE);
        let callbacks = SlackSocketModeListenerCallbacks::new().with_push_events(handle_push_events);
        let listener_env = Arc::new(
            SlackClientEventsListenerEnvironment::new(Arc::clone(&client))
                .with_user_state(ListenerState { events: tx }),
        );
        let listener = SlackClientSocketModeListener::new(
            &SlackClientSocketModeConfig::new(),
            listener_env,
            callbacks,
        );
        listener
            .listen_for(&config.app_api_token())
            .await
            .map_err(Error::Listener)?;
        info!("slack socket mode connected");

        let stop = cancel.child_token();
        let listener_stop = stop.clone();
        tokio::spawn(async move {
            listener_stop.cancelled().await;
            listener.shutdown().await;
            debug!("slack socket mode listener stopped");
        });
        tokio::spawn(directory::refresh_periodically(
            client,
            bot_token,
            names.clone(),
            stop.clone(),
        ));

        Ok(Self {
            events: rx,
            names,
            _stop: stop.drop_guard(),
        })
    }
}

#[async_trait]
impl MessageSource for SlackSource {
    /// The listener reconnects its websockets on its own, so the queue only
    /// closes once the listener has been shut down by the stop token or its
    /// parent. That is reported as [`murmur_channels::Error::Disconnected`].
    async fn next_message(&mut self) -> murmur_channels::Result<Option<InboundMessage>> {
        match self.events.recv().await {
            Some(message) => Ok(Some(message)),
            None => Err(murmur_channels::Error::disconnected(
                "slack socket mode listener stopped",
            )),
        }
    }

    fn directory(&self) -> Arc<dyn NameDirectory> {
        Arc::new(self.names.clone())
    }
}

async fn handle_push_events(
    event: SlackPushEventCallback,
    _client: Arc<SlackHyperClient>,
    states: SlackClientEventsUserState,
) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let SlackEventCallbackBody::Message(message) = &event.event else {
        debug!("ignoring event callback type");
        return Ok(());
    };
    let Some(inbound) = to_inbound(message) else {
        return Ok(());
    };

    let events = {
        let guard = states.read().await;
        let state = guard
            .get_user_state::<ListenerState>()
            .ok_or("missing socket mode state")?;
        state.events.clone()
    };
    if events.send(inbound).await.is_err() {
        debug!("relay stopped reading, dropping slack message");
    }
    Ok(())
}

/// Convert a message event; events without a channel are skipped.
fn to_inbound(event: &SlackMessageEvent) -> Option<InboundMessage> {
    let channel = event.origin.channel.as_ref()?.to_string();
    let user_id = event
        .sender
        .user
        .as_ref()
        .map(ToString::to_string)
        .or_else(|| event.sender.bot_id.as_ref().map(ToString::to_string))
        .unwrap_or_default();
    let text = event
        .content
        .as_ref()
        .and_then(|c| c.text.clone())
        .unwrap_or_default();

    let mut message = InboundMessage::new(channel, user_id, text);
    if let Some(subtype) = event.subtype.as_ref().and_then(subtype_name) {
        message = message.with_subtype(subtype);
    }
    Some(message)
}

/// The wire name of a message subtype, e.g. `bot_message`.
fn subtype_name(subtype: &SlackMessageEventType) -> Option<String> {
    match serde_json::to_value(subtype) {
        Ok(serde_json::Value::String(name)) => Some(name),
        _ => None,
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, murmur_channels::BOT_MESSAGE_SUBTYPE};

    fn event(value: serde_json::Value) -> SlackMessageEvent {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn user_message_is_converted() {
        let inbound = to_inbound(&event(serde_json::json!({
            "ts": "1700000000.000100",
            "channel": "C024BE91L",
            "user": "U2147483697",
            "text": "Hello world",
        })))
        .unwrap();
        assert_eq!(inbound, InboundMessage::new("C024BE91L", "U2147483697", "Hello world"));
        assert!(!inbound.is_bot_message());
    }

    #[test]
    fn bot_posts_keep_their_subtype() {
        let inbound = to_inbound(&event(serde_json::json!({
            "ts": "1700000000.000200",
            "channel": "C024BE91L",
            "subtype": "bot_message",
            "bot_id": "B123ABC456",
            "text": "deploy finished",
        })))
        .unwrap();
        assert_eq!(inbound.user_id, "B123ABC456");
        assert_eq!(inbound.subtype.as_deref(), Some(BOT_MESSAGE_SUBTYPE));
        assert!(inbound.is_bot_message());
    }

    #[test]
    fn events_without_channel_are_skipped() {
        assert!(
            to_inbound(&event(serde_json::json!({
                "ts": "1700000000.000300",
                "user": "U2147483697",
                "text": "orphan",
            })))
            .is_none()
        );
    }

    #[test]
    fn subtype_wire_names() {
        assert_eq!(
            subtype_name(&SlackMessageEventType::BotMessage).as_deref(),
            Some("bot_message")
        );
        assert_eq!(
            subtype_name(&SlackMessageEventType::MessageChanged).as_deref(),
            Some("message_changed")
        );
    }

    #[tokio::test]
    async fn closed_queue_reports_disconnect() {
        let (tx, rx) = mpsc::channel(1);
        drop(tx);
        let mut source = SlackSource {
            events: rx,
            names: NameTable::new(),
            _stop: CancellationToken::new().drop_guard(),
        };
        let err = source.next_message().await.unwrap_err();
        assert!(matches!(err, murmur_channels::Error::Disconnected { .. }), "{err}");
    }
}
