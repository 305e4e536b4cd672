// Comment translation with per-comment memoization.
//
// The cache lives on the comment record itself (a language-code -> text
// map), so a translation is computed at most once per (comment, language)
// pair in the absence of races. Concurrent first fills may both call the
// provider; last write wins and the duplication is accepted.

use crate::core::moderation::{CommentStore, ModerationError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranslationError {
    /// The provider failed to translate. Never retried automatically.
    #[error("Translation provider error: {0}")]
    Provider(String),

    #[error("Language detection error: {0}")]
    Detection(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Comment not found")]
    CommentNotFound,
}

impl From<ModerationError> for TranslationError {
    fn from(err: ModerationError) -> Self {
        match err {
            ModerationError::NotFound => TranslationError::CommentNotFound,
            other => TranslationError::StorageError(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub code: String,
    pub name: String,
}

/// Port for the external machine-translation provider.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Detect the language of `text`, returning a language code.
    async fn detect(&self, text: &str) -> Result<String, TranslationError>;

    /// Translate `text` into `target`, optionally hinting the source.
    async fn translate(
        &self,
        text: &str,
        target: &str,
        source: Option<&str>,
    ) -> Result<String, TranslationError>;

    async fn list_languages(&self) -> Result<Vec<Language>, TranslationError>;
}

pub struct TranslationService<P, S> {
    provider: P,
    store: S,
}

impl<P, S> TranslationService<P, S>
where
    P: TranslationProvider,
    S: CommentStore,
{
    pub fn new(provider: P, store: S) -> Self {
        Self { provider, store }
    }

    /// Translate a comment into `target`, serving from the per-comment
    /// cache when possible.
    ///
    /// When the source language is unknown it is detected first; detection
    /// failures degrade to "en" rather than blocking the translation.
    /// Translating into the source language returns the original text and
    /// stores nothing.
    pub async fn translate_comment(
        &self,
        comment_id: &str,
        target: &str,
    ) -> Result<String, TranslationError> {
        let comment = self
            .store
            .get(comment_id)
            .await?
            .ok_or(TranslationError::CommentNotFound)?;
        if comment.deleted {
            return Err(TranslationError::CommentNotFound);
        }

        if let Some(cached) = comment.translations.get(target) {
            return Ok(cached.clone());
        }

        let source = match &comment.language {
            Some(language) => language.clone(),
            None => match self.provider.detect(&comment.content).await {
                Ok(language) => language,
                Err(err) => {
                    tracing::warn!(comment_id, error = %err, "language detection failed; assuming en");
                    "en".to_string()
                }
            },
        };

        if source == target {
            return Ok(comment.content.clone());
        }

        let translated = self
            .provider
            .translate(&comment.content, target, Some(&source))
            .await?;
        self.store
            .save_translation(comment_id, target, &translated)
            .await?;
        Ok(translated)
    }

    /// Languages offered to the client. Falls back to the static list when
    /// the provider is unreachable, so the picker never comes up empty.
    pub async fn supported_languages(&self) -> Vec<Language> {
        match self.provider.list_languages().await {
            Ok(languages) if !languages.is_empty() => languages,
            Ok(_) => default_languages(),
            Err(err) => {
                tracing::warn!(error = %err, "language list unavailable; using the static fallback");
                default_languages()
            }
        }
    }
}

/// Static fallback language list.
pub fn default_languages() -> Vec<Language> {
    [
        ("en", "English"),
        ("hi", "Hindi"),
        ("ta", "Tamil"),
        ("te", "Telugu"),
        ("kn", "Kannada"),
        ("ml", "Malayalam"),
        ("bn", "Bengali"),
        ("gu", "Gujarati"),
        ("mr", "Marathi"),
        ("pa", "Punjabi"),
        ("ur", "Urdu"),
        ("es", "Spanish"),
        ("fr", "French"),
        ("de", "German"),
        ("ja", "Japanese"),
        ("ko", "Korean"),
        ("zh", "Chinese"),
        ("ar", "Arabic"),
        ("ru", "Russian"),
        ("pt", "Portuguese"),
    ]
    .iter()
    .map(|(code, name)| Language {
        code: code.to_string(),
        name: name.to_string(),
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::CommentRecord;
    use crate::infra::moderation::InMemoryCommentStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Counts calls so the tests can assert the cache actually short-circuits.
    #[derive(Clone)]
    struct MockProvider {
        detected: &'static str,
        translate_calls: Arc<AtomicUsize>,
        detect_calls: Arc<AtomicUsize>,
        fail_translate: bool,
        fail_detect: bool,
    }

    impl MockProvider {
        fn new(detected: &'static str) -> Self {
            Self {
                detected,
                translate_calls: Arc::default(),
                detect_calls: Arc::default(),
                fail_translate: false,
                fail_detect: false,
            }
        }
    }

    #[async_trait]
    impl TranslationProvider for MockProvider {
        async fn detect(&self, _text: &str) -> Result<String, TranslationError> {
            self.detect_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_detect {
                return Err(TranslationError::Detection("detector offline".to_string()));
            }
            Ok(self.detected.to_string())
        }

        async fn translate(
            &self,
            text: &str,
            target: &str,
            _source: Option<&str>,
        ) -> Result<String, TranslationError> {
            self.translate_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_translate {
                return Err(TranslationError::Provider("quota exceeded".to_string()));
            }
            Ok(format!("[{target}] {text}"))
        }

        async fn list_languages(&self) -> Result<Vec<Language>, TranslationError> {
            Err(TranslationError::Provider("unavailable".to_string()))
        }
    }

    async fn store_with_comment(language: Option<&str>) -> InMemoryCommentStore {
        let store = InMemoryCommentStore::new();
        store
            .insert(CommentRecord::new(
                "comment-1".to_string(),
                "video-1".to_string(),
                "maya".to_string(),
                "hello world".to_string(),
                "hello world".to_string(),
                language.map(str::to_string),
                None,
            ))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn second_request_is_served_from_the_cache() {
        let provider = MockProvider::new("en");
        let service = TranslationService::new(provider.clone(), store_with_comment(Some("en")).await);

        let first = service.translate_comment("comment-1", "hi").await.unwrap();
        assert_eq!(first, "[hi] hello world");
        let second = service.translate_comment("comment-1", "hi").await.unwrap();
        assert_eq!(second, first);

        assert_eq!(provider.translate_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn same_language_returns_the_original_without_storing() {
        let provider = MockProvider::new("en");
        let service = TranslationService::new(provider.clone(), store_with_comment(Some("en")).await);

        let text = service.translate_comment("comment-1", "en").await.unwrap();
        assert_eq!(text, "hello world");
        assert_eq!(provider.translate_calls.load(Ordering::SeqCst), 0);

        let stored = service.store.get("comment-1").await.unwrap().unwrap();
        assert!(stored.translations.is_empty());
    }

    #[tokio::test]
    async fn unknown_source_is_detected_first() {
        let provider = MockProvider::new("ta");
        let service = TranslationService::new(provider.clone(), store_with_comment(None).await);

        let text = service.translate_comment("comment-1", "hi").await.unwrap();
        assert_eq!(text, "[hi] hello world");
        assert_eq!(provider.detect_calls.load(Ordering::SeqCst), 1);

        // Target equals what detection found: original text comes back.
        let text = service.translate_comment("comment-1", "ta").await.unwrap();
        assert_eq!(text, "hello world");
    }

    #[tokio::test]
    async fn detection_failure_degrades_to_english() {
        let mut provider = MockProvider::new("ignored");
        provider.fail_detect = true;
        let service = TranslationService::new(provider.clone(), store_with_comment(None).await);

        // Detection fails, source assumed "en", translation proceeds.
        let text = service.translate_comment("comment-1", "hi").await.unwrap();
        assert_eq!(text, "[hi] hello world");
    }

    #[tokio::test]
    async fn provider_failure_propagates_and_caches_nothing() {
        let mut provider = MockProvider::new("en");
        provider.fail_translate = true;
        let service = TranslationService::new(provider.clone(), store_with_comment(Some("en")).await);

        let err = service.translate_comment("comment-1", "hi").await.unwrap_err();
        assert!(matches!(err, TranslationError::Provider(_)));

        let stored = service.store.get("comment-1").await.unwrap().unwrap();
        assert!(stored.translations.is_empty());
    }

    #[tokio::test]
    async fn missing_comment_is_a_distinct_error() {
        let provider = MockProvider::new("en");
        let service = TranslationService::new(provider, InMemoryCommentStore::new());

        let err = service.translate_comment("nope", "hi").await.unwrap_err();
        assert!(matches!(err, TranslationError::CommentNotFound));
    }

    #[tokio::test]
    async fn language_list_falls_back_to_the_static_set() {
        let provider = MockProvider::new("en");
        let service = TranslationService::new(provider, InMemoryCommentStore::new());

        let languages = service.supported_languages().await;
        assert_eq!(languages.len(), 20);
        assert!(languages.iter().any(|l| l.code == "ta"));
        assert!(languages.iter().any(|l| l.code == "en"));
    }
}
