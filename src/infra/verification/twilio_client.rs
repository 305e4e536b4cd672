// HTTP implementation of the SmsSender port against the Twilio Messages
// API.

use crate::core::verification::{SendError, SmsSender};
use async_trait::async_trait;
use reqwest::Client;

pub struct TwilioSmsClient {
    client: Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl TwilioSmsClient {
    pub fn new(account_sid: String, auth_token: String, from_number: String) -> Self {
        Self {
            client: Client::new(),
            account_sid,
            auth_token,
            from_number,
        }
    }

    /// Build from TWILIO_ACCOUNT_SID, TWILIO_AUTH_TOKEN and
    /// TWILIO_PHONE_NUMBER.
    pub fn from_env() -> anyhow::Result<Self> {
        let account_sid = std::env::var("TWILIO_ACCOUNT_SID")?;
        let auth_token = std::env::var("TWILIO_AUTH_TOKEN")?;
        let from_number = std::env::var("TWILIO_PHONE_NUMBER")?;
        Ok(Self::new(account_sid, auth_token, from_number))
    }
}

#[async_trait]
impl SmsSender for TwilioSmsClient {
    async fn send(&self, phone: &str, body: &str) -> Result<(), SendError> {
        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.account_sid
        );

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[
                ("To", phone),
                ("From", self.from_number.as_str()),
                ("Body", body),
            ])
            .send()
            .await
            .map_err(|e| SendError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(SendError(format!("Twilio API error: {} - {}", status, text)));
        }

        Ok(())
    }
}
