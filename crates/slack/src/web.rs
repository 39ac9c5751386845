use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use plusplus_core::config::SlackConfig;
use plusplus_core::{AccountDirectory, DirectoryError};

use crate::events::ReplyMessage;

pub const SLACK_API_BASE_URL: &str = "https://slack.com/api";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WebApiError {
    #[error("slack api request `{method}` failed: {message}")]
    Request { method: &'static str, message: String },
    #[error("slack api `{method}` returned error `{code}`")]
    Api { method: &'static str, code: String },
    #[error("slack api `{method}` response is missing `{field}`")]
    MissingField { method: &'static str, field: &'static str },
}

/// Delivers rendered replies to a channel.
#[async_trait]
pub trait ChatPoster: Send + Sync {
    async fn post_message(&self, reply: &ReplyMessage) -> Result<(), WebApiError>;
}

/// Poster that drops every reply. Used when the runner has nowhere to write.
#[derive(Default)]
pub struct NoopChatPoster;

#[async_trait]
impl ChatPoster for NoopChatPoster {
    async fn post_message(&self, _reply: &ReplyMessage) -> Result<(), WebApiError> {
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    ok: bool,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsersInfoResponse {
    #[serde(flatten)]
    status: ApiStatus,
    user: Option<UserInfo>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    #[serde(default)]
    is_bot: bool,
}

#[derive(Debug, Deserialize)]
struct ConnectionsOpenResponse {
    #[serde(flatten)]
    status: ApiStatus,
    url: Option<String>,
}

#[derive(Debug, Serialize)]
struct PostMessageRequest<'a> {
    channel: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    thread_ts: Option<&'a str>,
}

impl ApiStatus {
    fn into_result(self, method: &'static str) -> Result<(), WebApiError> {
        if self.ok {
            return Ok(());
        }
        Err(WebApiError::Api { method, code: self.error.unwrap_or_else(|| "unknown".to_owned()) })
    }
}

/// Minimal Slack Web API client covering the three methods the bot calls.
#[derive(Clone)]
pub struct SlackWebClient {
    client: Client,
    base_url: String,
    bot_token: SecretString,
    app_token: SecretString,
}

impl SlackWebClient {
    pub fn new(config: &SlackConfig) -> Self {
        Self::with_base_url(config, SLACK_API_BASE_URL)
    }

    pub fn with_base_url(config: &SlackConfig, base_url: impl Into<String>) -> Self {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build().unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            bot_token: config.bot_token.clone(),
            app_token: config.app_token.clone(),
        }
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }

    /// `apps.connections.open`: returns the `wss://` URL for a fresh Socket Mode session.
    pub async fn open_connection(&self) -> Result<String, WebApiError> {
        const METHOD: &str = "apps.connections.open";
        let response: ConnectionsOpenResponse = self
            .client
            .post(self.url(METHOD))
            .bearer_auth(self.app_token.expose_secret())
            .send()
            .await
            .map_err(|error| request_error(METHOD, error))?
            .json()
            .await
            .map_err(|error| request_error(METHOD, error))?;

        response.status.into_result(METHOD)?;
        response.url.ok_or(WebApiError::MissingField { method: METHOD, field: "url" })
    }

    /// `users.info`: whether the account is a bot.
    pub async fn user_is_bot(&self, user_id: &str) -> Result<bool, WebApiError> {
        const METHOD: &str = "users.info";
        let response: UsersInfoResponse = self
            .client
            .get(self.url(METHOD))
            .bearer_auth(self.bot_token.expose_secret())
            .query(&[("user", user_id)])
            .send()
            .await
            .map_err(|error| request_error(METHOD, error))?
            .json()
            .await
            .map_err(|error| request_error(METHOD, error))?;

        response.status.into_result(METHOD)?;
        let user = response.user.ok_or(WebApiError::MissingField { method: METHOD, field: "user" })?;
        debug!(event_name = "slack.users_info", user_id, is_bot = user.is_bot, "resolved account kind");
        Ok(user.is_bot)
    }

    /// `chat.postMessage`, threaded when the reply carries a thread timestamp.
    pub async fn post_reply(&self, reply: &ReplyMessage) -> Result<(), WebApiError> {
        const METHOD: &str = "chat.postMessage";
        let body = PostMessageRequest {
            channel: &reply.channel_id,
            text: &reply.text,
            thread_ts: reply.thread_ts.as_deref(),
        };
        let status: ApiStatus = self
            .client
            .post(self.url(METHOD))
            .bearer_auth(self.bot_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|error| request_error(METHOD, error))?
            .json()
            .await
            .map_err(|error| request_error(METHOD, error))?;

        status.into_result(METHOD)
    }
}

fn request_error(method: &'static str, error: reqwest::Error) -> WebApiError {
    WebApiError::Request { method, message: error.to_string() }
}

#[async_trait]
impl ChatPoster for SlackWebClient {
    async fn post_message(&self, reply: &ReplyMessage) -> Result<(), WebApiError> {
        self.post_reply(reply).await
    }
}

#[async_trait]
impl AccountDirectory for SlackWebClient {
    async fn is_automated(&self, account_id: &str) -> Result<bool, DirectoryError> {
        self.user_is_bot(account_id).await.map_err(|error| DirectoryError::Lookup {
            account_id: account_id.to_owned(),
            message: error.to_string(),
        })
    }
}
