// HTTP implementation of the EmailSender port against a Mailgun-style
// messages API.

use crate::core::verification::{EmailSender, SendError};
use async_trait::async_trait;
use reqwest::Client;

pub struct HttpMailClient {
    client: Client,
    api_base: String,
    api_key: String,
    from: String,
}

impl HttpMailClient {
    pub fn new(api_base: String, api_key: String, from: String) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
            from,
        }
    }

    /// Build from MAIL_API_BASE, MAIL_API_KEY and MAIL_FROM.
    pub fn from_env() -> anyhow::Result<Self> {
        let api_base = std::env::var("MAIL_API_BASE")?;
        let api_key = std::env::var("MAIL_API_KEY")?;
        let from = std::env::var("MAIL_FROM")?;
        Ok(Self::new(api_base, api_key, from))
    }
}

#[async_trait]
impl EmailSender for HttpMailClient {
    async fn send(&self, address: &str, subject: &str, body: &str) -> Result<(), SendError> {
        let url = format!("{}/messages", self.api_base);

        let response = self
            .client
            .post(&url)
            .basic_auth("api", Some(&self.api_key))
            .form(&[
                ("from", self.from.as_str()),
                ("to", address),
                ("subject", subject),
                ("text", body),
            ])
            .send()
            .await
            .map_err(|e| SendError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(SendError(format!("mail API error: {} - {}", status, text)));
        }

        Ok(())
    }
}
