//! # Alerter Crate
//!
//! Delivers the bot's human-readable notifications. [`TelegramAlerter`] posts them to a
//! Telegram chat; [`LogNotifier`] writes them to the log when Telegram is not configured.

pub mod error;

pub use error::AlerterError;

use async_trait::async_trait;
use configuration::TelegramConfig;
use mediator::{Mediator, SendNotificationRequest};
use reqwest::Client;
use serde::Serialize;
use std::sync::{Arc, Weak};

const TELEGRAM_API: &str = "https://api.telegram.org";

/// Outbound messaging capability of the bot.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Receives the bot's back-reference when the notifier is bound into it.
    fn set_mediator(&self, _mediator: Weak<dyn Mediator>) {}

    async fn send_notification(&self, request: &SendNotificationRequest) -> Result<(), AlerterError>;
}

/// The JSON payload for the Telegram `sendMessage` endpoint.
#[derive(Debug, Serialize)]
struct SendMessagePayload<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

/// A client for sending messages to the Telegram Bot API.
pub struct TelegramAlerter {
    client: Client,
    api_base: String,
    token: String,
    chat_id: String,
}

impl TelegramAlerter {
    /// Creates a new `TelegramAlerter`.
    ///
    /// Returns `None` if the token or chat_id is missing from the configuration,
    /// allowing the system to gracefully disable alerting.
    pub fn new(config: &TelegramConfig) -> Option<Self> {
        if config.token.is_empty() || config.chat_id.is_empty() {
            tracing::warn!("Telegram alerter is not configured (missing token or chat_id).");
            return None;
        }
        Some(Self {
            client: Client::new(),
            api_base: TELEGRAM_API.to_string(),
            token: config.token.clone(),
            chat_id: config.chat_id.clone(),
        })
    }

    /// Points the alerter at a different Bot API host.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Sends a text message to the configured Telegram chat.
    pub async fn send_message(&self, message: &str) -> Result<(), AlerterError> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.token);
        let text = escape_markdown(message);

        let payload = SendMessagePayload {
            chat_id: &self.chat_id,
            text: &text,
            parse_mode: "MarkdownV2",
        };

        let response = self.client.post(&url).json(&payload).send().await?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to decode error response".to_string());
            return Err(AlerterError::ApiError(error_text));
        }

        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramAlerter {
    async fn send_notification(&self, request: &SendNotificationRequest) -> Result<(), AlerterError> {
        self.send_message(&request.message).await
    }
}

/// Writes notifications to the log instead of a chat.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_notification(&self, request: &SendNotificationRequest) -> Result<(), AlerterError> {
        tracing::info!(target: "notification", "{}", request.message);
        Ok(())
    }
}

/// Picks the Telegram notifier when it is configured and falls back to the log otherwise.
pub fn build_notifier(config: &TelegramConfig) -> Arc<dyn Notifier> {
    match TelegramAlerter::new(config) {
        Some(alerter) => Arc::new(alerter),
        None => Arc::new(LogNotifier),
    }
}

/// Escapes the characters that have special meaning in Telegram's MarkdownV2.
pub fn escape_markdown(text: &str) -> String {
    let special_chars = r"\_*[]()~`>#+-=|{}.!";
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if special_chars.contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
