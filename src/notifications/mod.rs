//! Owner notification delivery.
//!
//! Admin broadcasts are POSTed as JSON to a configured webhook. Delivery
//! failures are reported to the caller but never abort the recording write.

use anyhow::{anyhow, Context, Result};

use crate::config::NotifyConfig;

#[derive(Clone)]
pub struct OwnerNotifier {
    config: NotifyConfig,
    client: reqwest::Client,
}

impl OwnerNotifier {
    pub fn new(config: NotifyConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    pub fn is_configured(&self) -> bool {
        self.config.owner_webhook_url.is_some()
    }

    /// POST the broadcast to the owner webhook.
    pub async fn send(&self, title: &str, content: &str) -> Result<()> {
        let url = self
            .config
            .owner_webhook_url
            .as_deref()
            .ok_or_else(|| anyhow!("owner webhook is not configured"))?;

        let response = self
            .client
            .post(url)
            .json(&serde_json::json!({
                "title": title,
                "content": content,
            }))
            .send()
            .await
            .context("owner webhook request failed")?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "owner webhook returned status {}",
                response.status()
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_configured() {
        let client = reqwest::Client::new();

        let unconfigured = OwnerNotifier::new(NotifyConfig::default(), client.clone());
        assert!(!unconfigured.is_configured());

        let configured = OwnerNotifier::new(
            NotifyConfig {
                owner_webhook_url: Some("https://example.com/hook".to_string()),
            },
            client,
        );
        assert!(configured.is_configured());
    }

    #[tokio::test]
    async fn test_send_errors_when_unconfigured() {
        let notifier = OwnerNotifier::new(NotifyConfig::default(), reqwest::Client::new());
        assert!(notifier.send("t", "c").await.is_err());
    }
}
