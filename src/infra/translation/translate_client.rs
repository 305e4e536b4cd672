// HTTP implementation of the TranslationProvider port against a
// LibreTranslate-compatible API.

use crate::core::translation::{Language, TranslationError, TranslationProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

pub struct HttpTranslateClient {
    client: Client,
    api_base: String,
    api_key: Option<String>,
}

impl HttpTranslateClient {
    pub fn new(api_base: String, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Build from TRANSLATE_API_BASE and the optional TRANSLATE_API_KEY.
    pub fn from_env() -> anyhow::Result<Self> {
        let api_base = std::env::var("TRANSLATE_API_BASE")?;
        let api_key = std::env::var("TRANSLATE_API_KEY").ok();
        Ok(Self::new(api_base, api_key))
    }
}

#[derive(Debug, Deserialize)]
struct DetectEntry {
    language: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateResponse {
    translated_text: String,
}

#[derive(Debug, Deserialize)]
struct LanguageEntry {
    code: String,
    name: String,
}

#[async_trait]
impl TranslationProvider for HttpTranslateClient {
    async fn detect(&self, text: &str) -> Result<String, TranslationError> {
        let url = format!("{}/detect", self.api_base);

        let mut payload = json!({ "q": text });
        if let Some(key) = &self.api_key {
            payload["api_key"] = json!(key);
        }

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| TranslationError::Detection(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TranslationError::Detection(format!(
                "detect returned HTTP {}",
                response.status()
            )));
        }

        // The endpoint returns candidates ordered by confidence.
        let candidates: Vec<DetectEntry> = response
            .json()
            .await
            .map_err(|e| TranslationError::Detection(e.to_string()))?;

        candidates
            .into_iter()
            .next()
            .map(|entry| entry.language)
            .ok_or_else(|| TranslationError::Detection("no candidate language".to_string()))
    }

    async fn translate(
        &self,
        text: &str,
        target: &str,
        source: Option<&str>,
    ) -> Result<String, TranslationError> {
        let url = format!("{}/translate", self.api_base);

        let mut payload = json!({
            "q": text,
            "source": source.unwrap_or("auto"),
            "target": target,
        });
        if let Some(key) = &self.api_key {
            payload["api_key"] = json!(key);
        }

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| TranslationError::Provider(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(TranslationError::Provider(format!(
                "translate API error: {} - {}",
                status, text
            )));
        }

        let body: TranslateResponse = response
            .json()
            .await
            .map_err(|e| TranslationError::Provider(e.to_string()))?;

        Ok(body.translated_text)
    }

    async fn list_languages(&self) -> Result<Vec<Language>, TranslationError> {
        let url = format!("{}/languages", self.api_base);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| TranslationError::Provider(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TranslationError::Provider(format!(
                "languages returned HTTP {}",
                response.status()
            )));
        }

        let entries: Vec<LanguageEntry> = response
            .json()
            .await
            .map_err(|e| TranslationError::Provider(e.to_string()))?;

        Ok(entries
            .into_iter()
            .map(|entry| Language {
                code: entry.code,
                name: entry.name,
            })
            .collect())
    }
}
