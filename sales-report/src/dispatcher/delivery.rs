//! Telegram Bot API delivery

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::{ReportError, ReportResult};

use super::collaborators::{DeliveryChannel, TenantId};

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: TenantId,
    text: &'a str,
    parse_mode: &'static str,
}

#[derive(Deserialize)]
struct ApiReply {
    #[serde(default)]
    description: Option<String>,
}

/// Sends Markdown messages through a bot
#[derive(Clone)]
pub struct TelegramDelivery {
    client: reqwest::Client,
    base_url: String,
    bot_token: String,
}

impl std::fmt::Debug for TelegramDelivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramDelivery")
            .field("base_url", &self.base_url)
            .field("bot_token", &"***")
            .finish()
    }
}

impl TelegramDelivery {
    pub fn new(bot_token: impl Into<String>, timeout: Duration) -> ReportResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReportError::Delivery(e.to_string()))?;
        Ok(Self {
            client,
            base_url: TELEGRAM_API_BASE.to_string(),
            bot_token: bot_token.into(),
        })
    }

    /// Point at a different API host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl DeliveryChannel for TelegramDelivery {
    async fn deliver(&self, tenant: TenantId, text: &str) -> ReportResult<()> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.bot_token);
        let body = SendMessage {
            chat_id: tenant,
            text,
            parse_mode: "Markdown",
        };

        // The URL embeds the bot token; strip it from transport errors
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ReportError::Delivery(e.without_url().to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let description = response
            .json::<ApiReply>()
            .await
            .ok()
            .and_then(|r| r.description)
            .unwrap_or_default();
        tracing::warn!(tenant = %tenant, status = %status, "Message rejected");
        Err(ReportError::Delivery(format!("HTTP {status}: {description}")))
    }
}
