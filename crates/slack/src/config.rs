use {
    secrecy::{ExposeSecret, Secret},
    slack_morphism::prelude::{SlackApiToken, SlackApiTokenValue},
};

/// Credentials for one Slack workspace.
#[derive(Clone)]
pub struct SlackConfig {
    /// Bot token (`xoxb-...`) for Web API calls.
    pub bot_token: Secret<String>,
    /// App-level token (`xapp-...`) for the Socket Mode connection.
    pub app_token: Secret<String>,
}

impl SlackConfig {
    #[must_use]
    pub fn new(bot_token: impl Into<String>, app_token: impl Into<String>) -> Self {
        Self {
            bot_token: Secret::new(bot_token.into()),
            app_token: Secret::new(app_token.into()),
        }
    }

    pub(crate) fn bot_api_token(&self) -> SlackApiToken {
        api_token(&self.bot_token)
    }

    pub(crate) fn app_api_token(&self) -> SlackApiToken {
        api_token(&self.app_token)
    }
}

fn api_token(secret: &Secret<String>) -> SlackApiToken {
    let value: SlackApiTokenValue = secret.expose_secret().clone().into();
    SlackApiToken::new(value)
}

impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("bot_token", &"[REDACTED]")
            .field("app_token", &"[REDACTED]")
            .finish()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_tokens() {
        let config = SlackConfig::new("xoxb-secret", "xapp-secret");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("secret"), "{rendered}");
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn tokens_reach_the_api_client() {
        let config = SlackConfig::new("xoxb-1", "xapp-2");
        assert_eq!(config.bot_api_token().token_value.0, "xoxb-1");
        assert_eq!(config.app_api_token().token_value.0, "xapp-2");
    }
}
