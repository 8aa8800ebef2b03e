use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use {async_trait::async_trait, tokio::sync::mpsc};

use crate::{Result, message::InboundMessage};

/// Resolves identifiers to display names.
///
/// The chat client keeps the tables fresh; the relay only reads them.
pub trait NameDirectory: Send + Sync {
    fn channel_name(&self, channel_id: &str) -> Option<String>;
    fn user_name(&self, user_id: &str) -> Option<String>;
}

/// The chat-side collaborator the relay pulls messages from.
#[async_trait]
pub trait MessageSource: Send {
    /// Wait for the next message.
    ///
    /// `Ok(None)` means the source ended cleanly; an error means the
    /// connection was lost and the caller may reconnect.
    async fn next_message(&mut self) -> Result<Option<InboundMessage>>;

    /// Name lookups for messages from this source.
    fn directory(&self) -> Arc<dyn NameDirectory>;
}

type Names = Arc<RwLock<HashMap<String, String>>>;

/// Shared, swappable id → name tables.
#[derive(Debug, Clone, Default)]
pub struct NameTable {
    channels: Names,
    users: Names,
}

impl NameTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole channel table.
    pub fn replace_channels(&self, entries: impl IntoIterator<Item = (String, String)>) {
        replace(&self.channels, entries);
    }

    /// Replace the whole user table.
    pub fn replace_users(&self, entries: impl IntoIterator<Item = (String, String)>) {
        replace(&self.users, entries);
    }

    pub fn insert_channel(&self, id: impl Into<String>, name: impl Into<String>) {
        self.channels
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.into(), name.into());
    }

    pub fn insert_user(&self, id: impl Into<String>, name: impl Into<String>) {
        self.users
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.into(), name.into());
    }

    /// `(channels, users)` currently known.
    #[must_use]
    pub fn counts(&self) -> (usize, usize) {
        (lookup_len(&self.channels), lookup_len(&self.users))
    }
}

fn replace(table: &Names, entries: impl IntoIterator<Item = (String, String)>) {
    let fresh: HashMap<String, String> = entries.into_iter().collect();
    *table.write().unwrap_or_else(PoisonError::into_inner) = fresh;
}

fn lookup_len(table: &Names) -> usize {
    table.read().unwrap_or_else(PoisonError::into_inner).len()
}

fn lookup(table: &Names, id: &str) -> Option<String> {
    table
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(id)
        .filter(|name| !name.is_empty())
        .cloned()
}

impl NameDirectory for NameTable {
    fn channel_name(&self, channel_id: &str) -> Option<String> {
        lookup(&self.channels, channel_id)
    }

    fn user_name(&self, user_id: &str) -> Option<String> {
        lookup(&self.users, user_id)
    }
}

/// A [`MessageSource`] fed through a bounded in-process queue.
///
/// Chat clients push into the paired sender; dropping every sender ends the
/// source.
pub struct QueueSource {
    rx: mpsc::Receiver<InboundMessage>,
    names: NameTable,
}

impl QueueSource {
    #[must_use]
    pub fn new(capacity: usize, names: NameTable) -> (Self, mpsc::Sender<InboundMessage>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { rx, names }, tx)
    }
}

#[async_trait]
impl MessageSource for QueueSource {
    async fn next_message(&mut self) -> Result<Option<InboundMessage>> {
        Ok(self.rx.recv().await)
    }

    fn directory(&self) -> Arc<dyn NameDirectory> {
        Arc::new(self.names.clone())
    }
}
