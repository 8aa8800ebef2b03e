//! Channel and user name tables loaded through the Web API.

use std::time::Duration;

use {
    murmur_channels::NameTable,
    slack_morphism::prelude::*,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::error::{Error, Result};

/// How often the name tables are reloaded.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(10 * 60);

const PAGE_SIZE: u16 = 200;

/// Every public and private channel the bot can see, as `(id, name)`.
pub async fn load_channels(
    client: &SlackHyperClient,
    token: &SlackApiToken,
) -> Result<Vec<(String, String)>> {
    let session = client.open_session(token);
    let mut entries = Vec::new();
    let mut cursor = None;
    loop {
        let mut request = SlackApiConversationsListRequest::new()
            .with_limit(PAGE_SIZE)
            .with_exclude_archived(true)
            .with_types(vec![
                SlackConversationType::Public,
                SlackConversationType::Private,
            ]);
        if let Some(cursor) = cursor.take() {
            request = request.with_cursor(cursor);
        }
        let page = session
            .conversations_list(&request)
            .await
            .map_err(Error::api("conversations.list"))?;

        entries.extend(
            page.channels
                .into_iter()
                .filter_map(|channel| Some((channel.id.to_string(), channel.name?))),
        );
        cursor = next_cursor(page.response_metadata);
        if cursor.is_none() {
            return Ok(entries);
        }
    }
}

/// Every member of the workspace, as `(id, name)`.
pub async fn load_users(
    client: &SlackHyperClient,
    token: &SlackApiToken,
) -> Result<Vec<(String, String)>> {
    let session = client.open_session(token);
    let mut entries = Vec::new();
    let mut cursor = None;
    loop {
        let mut request = SlackApiUsersListRequest::new().with_limit(PAGE_SIZE);
        if let Some(cursor) = cursor.take() {
            request = request.with_cursor(cursor);
        }
        let page = session
            .users_list(&request)
            .await
            .map_err(Error::api("users.list"))?;

        entries.extend(
            page.members
                .into_iter()
                .filter_map(|user| Some((user.id.to_string(), user.name?))),
        );
        cursor = next_cursor(page.response_metadata);
        if cursor.is_none() {
            return Ok(entries);
        }
    }
}

/// Slack signals the last page with a missing or empty cursor.
fn next_cursor(metadata: Option<SlackResponseMetadata>) -> Option<SlackCursorId> {
    metadata
        .and_then(|m| m.next_cursor)
        .filter(|cursor| !cursor.0.is_empty())
}

/// Reload both tables into `names`.
pub async fn refresh(
    client: &SlackHyperClient,
    token: &SlackApiToken,
    names: &NameTable,
) -> Result<()> {
    let channels = load_channels(client, token).await?;
    let users = load_users(client, token).await?;
    names.replace_channels(channels);
    names.replace_users(users);

    let (channels, users) = names.counts();
    info!(channels, users, "slack name tables loaded");
    Ok(())
}

/// Reload the tables every [`REFRESH_INTERVAL`] until `cancel` fires.
///
/// A failed reload keeps the previous tables.
pub(crate) async fn refresh_periodically(
    client: std::sync::Arc<SlackHyperClient>,
    token: SlackApiToken,
    names: NameTable,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(REFRESH_INTERVAL);
    // The first tick completes immediately; connect already loaded the tables.
    ticker.tick().await;
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(e) = refresh(&client, &token, &names).await {
                    warn!(error = %e, "failed to refresh slack name tables");
                }
            },
        }
    }
    debug!("slack name refresh stopped");
}
