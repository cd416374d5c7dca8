// libs/notification-cell/src/services/mailer.rs
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use shared_config::AppConfig;

use crate::models::NotificationError;

/// Thin client for the transactional mail relay.
/// POST {MAIL_API_URL}/messages with a bearer token.
pub struct MailerClient {
    client: Client,
    base_url: String,
    api_token: String,
    from_address: String,
    configured: bool,
}

impl MailerClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.mail_api_url.clone(),
            api_token: config.mail_api_token.clone(),
            from_address: config.mail_from_address.clone(),
            configured: config.is_mail_configured(),
        }
    }

    pub async fn send(
        &self,
        to: &str,
        subject: &str,
        text: &str,
    ) -> Result<(), NotificationError> {
        if !self.configured {
            // Missing relay config downgrades email to a logged no-op; a
            // booking must never fail because mail is unconfigured.
            warn!("Mail relay not configured, skipping email to {}", to);
            return Ok(());
        }

        let url = format!("{}/messages", self.base_url);
        debug!("Sending email to {} via {}", to, url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .json(&json!({
                "from": self.from_address,
                "to": to,
                "subject": subject,
                "text": text,
            }))
            .send()
            .await
            .map_err(|e| NotificationError::Mail(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::Mail(format!("HTTP {}: {}", status, body)));
        }

        debug!("Email accepted by relay for {}", to);
        Ok(())
    }
}
