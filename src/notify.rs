//! Chat-webhook alerts (Microsoft Teams MessageCard format).

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info};

use crate::contract::Alerter;

#[derive(Serialize, Debug)]
struct MessageCard<'a> {
    #[serde(rename = "@type")]
    kind: &'static str,
    #[serde(rename = "@context")]
    context: &'static str,
    summary: &'a str,
    #[serde(rename = "themeColor")]
    theme_color: &'static str,
    title: &'a str,
    text: &'a str,
}

/// Posts alerts to a Teams incoming webhook; a no-op when no webhook is set.
pub struct TeamsNotifier {
    client: Client,
    webhook: Option<String>,
}

impl TeamsNotifier {
    pub fn new(webhook: Option<String>) -> Self {
        Self {
            client: Client::new(),
            webhook,
        }
    }
}

#[async_trait]
impl Alerter for TeamsNotifier {
    async fn alert(&self, title: &str, message: &str) {
        let Some(webhook) = self.webhook.as_deref() else {
            info!("Teams webhook not configured, skipping notification");
            return;
        };
        let card = MessageCard {
            kind: "MessageCard",
            context: "http://schema.org/extensions",
            summary: title,
            theme_color: "0076D7",
            title,
            text: message,
        };
        match self.client.post(webhook).json(&card).send().await {
            Ok(resp) if resp.status().is_success() => info!(title, "Teams notification sent"),
            Ok(resp) => error!(status = %resp.status(), title, "Teams webhook rejected notification"),
            Err(e) => error!(error = ?e, title, "Failed to send Teams notification"),
        }
    }
}
