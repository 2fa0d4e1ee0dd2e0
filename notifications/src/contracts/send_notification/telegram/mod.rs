use crate::config::TelegramConfig;
use crate::contracts::send_notification::{DeliveryError, DeliveryStrategy};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use shared_kernel::http_client::HttpClient;
use shared_kernel::recipient_id::RecipientId;
use url::Url;

/// Sends Markdown messages through the Telegram Bot API.
pub struct TelegramDelivery {
    config: TelegramConfig,
}

#[derive(Serialize, Debug)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'static str,
}

#[derive(Deserialize, Debug)]
struct ApiResponse {
    ok: bool,
    error_code: Option<u16>,
    description: Option<String>,
}

impl ApiResponse {
    fn into_result(self, recipient: RecipientId) -> Result<(), DeliveryError> {
        if self.ok {
            return Ok(());
        }
        let reason = self
            .description
            .unwrap_or_else(|| "no description".to_string());
        let unreachable = match self.error_code {
            Some(403) => true,
            Some(400) => reason.to_lowercase().contains("chat not found"),
            _ => false,
        };
        if unreachable {
            return Err(DeliveryError::RecipientUnreachable { recipient, reason });
        }
        Err(DeliveryError::Failed {
            recipient,
            source: anyhow!("Telegram answered {:?}: {reason}", self.error_code),
        })
    }
}

impl TelegramDelivery {
    pub fn new(config: TelegramConfig) -> Self {
        Self { config }
    }

    fn send_message_url(&self) -> anyhow::Result<Url> {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.config.host,
            self.config.bot_token.expose_secret()
        );
        Url::parse(&url).with_context(|| format!("Invalid telegram host {}", self.config.host))
    }
}

#[async_trait]
impl DeliveryStrategy for TelegramDelivery {
    #[tracing::instrument(err, skip(self, text), level = "debug")]
    async fn deliver(&self, recipient: RecipientId, text: &str) -> Result<(), DeliveryError> {
        let failed = |source| DeliveryError::Failed { recipient, source };
        let url = self.send_message_url().map_err(failed)?;
        let body = SendMessage {
            chat_id: recipient.inner(),
            text,
            parse_mode: "Markdown",
        };
        let response = HttpClient::post_json::<_, ApiResponse>(url, &body, self.config.timeout())
            .await
            .map_err(failed)?;
        response.into_result(recipient)
    }
}
