use std::collections::HashSet;

use murmur_config::{ConditionConfig, MurmurConfig};

use crate::{
    error::{Error, Result},
    message::InboundMessage,
    pronunciation::Pronunciation,
};

/// Include/exclude sets and pronunciation rules for one dimension.
///
/// Built once at startup and never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct Condition {
    pronunciation: Pronunciation,
    includes: HashSet<String>,
    excludes: HashSet<String>,
}

impl Condition {
    /// Fails if the pronunciation list is not made of pairs.
    pub fn new(config: &ConditionConfig) -> Result<Self> {
        Ok(Self {
            pronunciation: Pronunciation::new(config.yomi.as_slice())?,
            includes: config.includes.iter().cloned().collect(),
            excludes: config.excludes.iter().cloned().collect(),
        })
    }

    /// Exact membership in the include list.
    #[must_use]
    pub fn is_included(&self, value: Option<&str>) -> bool {
        value.is_some_and(|v| self.includes.contains(v))
    }

    /// Exact membership in the exclude list.
    #[must_use]
    pub fn is_excluded(&self, value: Option<&str>) -> bool {
        value.is_some_and(|v| self.excludes.contains(v))
    }

    #[must_use]
    pub fn pronunciation(&self) -> &Pronunciation {
        &self.pronunciation
    }
}

/// Decides whether an inbound message is spoken.
#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    pub channel: Condition,
    pub user: Condition,
    pub keyword: Condition,
    /// Whether automated posts are eligible.
    pub bot_message: bool,
}

impl MessageFilter {
    pub fn from_config(config: &MurmurConfig) -> Result<Self> {
        let build = |dimension: &'static str, cfg: &ConditionConfig| {
            Condition::new(cfg).map_err(|e| Error::condition(dimension, e))
        };
        Ok(Self {
            channel: build("channel", &config.channel)?,
            user: build("user", &config.user)?,
            keyword: build("keyword", &config.keyword)?,
            bot_message: config.bot_message,
        })
    }

    /// Evaluate the rules against one message, first match wins:
    ///
    /// 1. any include (channel name, user name, text) accepts
    /// 2. bot posts are rejected unless enabled
    /// 3. any exclude rejects
    /// 4. everything else is accepted
    ///
    /// Names the directory could not resolve are passed as `None` and never
    /// match a list.
    #[must_use]
    pub fn accept(
        &self,
        msg: &InboundMessage,
        channel_name: Option<&str>,
        user_name: Option<&str>,
    ) -> bool {
        let text = Some(msg.text.as_str());

        if self.channel.is_included(channel_name)
            || self.user.is_included(user_name)
            || self.keyword.is_included(text)
        {
            return true;
        }
        if !self.bot_message && msg.is_bot_message() {
            return false;
        }
        if self.channel.is_excluded(channel_name)
            || self.user.is_excluded(user_name)
            || self.keyword.is_excluded(text)
        {
            return false;
        }
        true
    }
}
