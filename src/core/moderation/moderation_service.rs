// Comment moderation pipeline - core business logic for keeping the
// comment section usable.
//
// This service handles:
// - Submission validation (length, special characters, repetition,
//   shouting, link-like content)
// - Cleaning (control characters, profanity masking, whitespace)
// - The dislike auto-deletion rule
//
// NO storage dependencies here - persistence sits behind the CommentStore
// port.

use super::moderation_models::{
    CommentRecord, DeletionReason, DislikeOutcome, ModerationConfig, ReactionSnapshot,
    RejectReason,
};
use crate::core::location::Location;
use async_trait::async_trait;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Comment rejected: {0}")]
    Rejected(RejectReason),

    #[error("Comment not found")]
    NotFound,
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Persistence for comment records.
///
/// Reaction toggles and `mark_deleted` must be atomic per comment: the
/// returned snapshot reflects the state right after the toggle, with no
/// interleaved writer in between. That atomicity plus the one-way deleted
/// flag is what makes the auto-deletion rule fire exactly once under
/// concurrent dislikes.
#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn insert(&self, record: CommentRecord) -> Result<(), ModerationError>;

    async fn get(&self, comment_id: &str) -> Result<Option<CommentRecord>, ModerationError>;

    /// Non-deleted comments for a video, newest first.
    async fn list_visible(&self, video_id: &str) -> Result<Vec<CommentRecord>, ModerationError>;

    /// Toggle a like. Adding a like removes an existing dislike by the same
    /// user. `None` when the comment is missing or deleted.
    async fn toggle_like(
        &self,
        comment_id: &str,
        user: &str,
    ) -> Result<Option<ReactionSnapshot>, ModerationError>;

    /// Toggle a dislike. Adding a dislike removes an existing like by the
    /// same user. `None` when the comment is missing or deleted.
    async fn toggle_dislike(
        &self,
        comment_id: &str,
        user: &str,
    ) -> Result<Option<ReactionSnapshot>, ModerationError>;

    /// One-way transition to deleted. Returns false when the comment was
    /// already deleted (or missing) so callers fire side effects exactly
    /// once.
    async fn mark_deleted(
        &self,
        comment_id: &str,
        reason: DeletionReason,
    ) -> Result<bool, ModerationError>;

    async fn save_translation(
        &self,
        comment_id: &str,
        language: &str,
        text: &str,
    ) -> Result<(), ModerationError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct ModerationService<S: CommentStore> {
    store: S,
    config: ModerationConfig,
}

impl<S: CommentStore> ModerationService<S> {
    pub fn new(store: S, config: ModerationConfig) -> Self {
        Self { store, config }
    }

    /// Validate a submission. Checks run in a fixed order and stop at the
    /// first failure.
    pub fn validate(&self, text: &str) -> Result<(), RejectReason> {
        if text.trim().is_empty() {
            return Err(RejectReason::Empty);
        }

        let char_count = text.chars().count();
        if char_count > self.config.max_length {
            return Err(RejectReason::TooLong {
                max: self.config.max_length,
            });
        }
        if char_count < self.config.min_length {
            return Err(RejectReason::TooShort {
                min: self.config.min_length,
            });
        }

        // Special characters: a long unbroken run, or too high an overall
        // concentration. Supported scripts are allowlisted in both checks so
        // native-script comments are never penalized.
        let mut special_total = 0usize;
        let mut run = 0usize;
        let mut longest_run = 0usize;
        for c in text.chars() {
            if is_special_char(c) {
                special_total += 1;
                run += 1;
                longest_run = longest_run.max(run);
            } else {
                run = 0;
            }
        }
        if longest_run >= self.config.special_run_limit {
            return Err(RejectReason::SpecialCharRun {
                limit: self.config.special_run_limit,
            });
        }
        if special_total as f64 / char_count as f64 > self.config.special_ratio_limit {
            return Err(RejectReason::SpecialCharRatio);
        }

        // Repetition spam ("aaaaaaa", "!!!!!!!!" is caught above already).
        let mut prev: Option<char> = None;
        let mut repeats = 0usize;
        for c in text.chars() {
            if prev == Some(c) {
                repeats += 1;
            } else {
                prev = Some(c);
                repeats = 1;
            }
            if repeats >= self.config.repeat_limit {
                return Err(RejectReason::RepeatedCharacters {
                    limit: self.config.repeat_limit,
                });
            }
        }

        // Shouting, only judged once there is enough text to judge.
        let letters = text.chars().filter(|c| c.is_ascii_alphabetic()).count();
        if letters > self.config.caps_min_letters {
            let uppercase = text.chars().filter(|c| c.is_ascii_uppercase()).count();
            if uppercase as f64 / letters as f64 > self.config.caps_ratio_limit {
                return Err(RejectReason::ExcessiveCaps);
            }
        }

        let lowered = text.to_lowercase();
        if LINK_MARKERS.iter().any(|marker| lowered.contains(marker)) {
            return Err(RejectReason::LinkLike);
        }

        Ok(())
    }

    /// Normalize text for storage: drop control characters, mask profanity
    /// while preserving structure, collapse whitespace runs, trim.
    pub fn clean(&self, text: &str) -> String {
        let stripped: String = text
            .chars()
            .filter(|c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
            .collect();

        let masked = mask_profanity(&stripped);

        masked.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Validate, clean and persist a new comment.
    pub async fn submit(
        &self,
        video_id: &str,
        author: &str,
        text: &str,
        location: Option<Location>,
        language: Option<String>,
    ) -> Result<CommentRecord, ModerationError> {
        self.validate(text).map_err(ModerationError::Rejected)?;

        let record = CommentRecord::new(
            generate_comment_id(),
            video_id.to_string(),
            author.to_string(),
            self.clean(text),
            text.to_string(),
            language,
            location,
        );
        self.store.insert(record.clone()).await?;
        Ok(record)
    }

    pub async fn comments_for_video(
        &self,
        video_id: &str,
    ) -> Result<Vec<CommentRecord>, ModerationError> {
        self.store.list_visible(video_id).await
    }

    pub async fn register_like(
        &self,
        comment_id: &str,
        user: &str,
    ) -> Result<ReactionSnapshot, ModerationError> {
        self.store
            .toggle_like(comment_id, user)
            .await?
            .ok_or(ModerationError::NotFound)
    }

    /// Toggle a dislike and apply the auto-deletion rule.
    ///
    /// The rule only fires when a dislike was newly added and the count is
    /// at the threshold; `mark_deleted` reports whether this call actually
    /// performed the transition, so a concurrent dislike that crossed the
    /// threshold first wins and this one reports `auto_deleted: false`.
    pub async fn register_dislike(
        &self,
        comment_id: &str,
        user: &str,
    ) -> Result<DislikeOutcome, ModerationError> {
        let snapshot = self
            .store
            .toggle_dislike(comment_id, user)
            .await?
            .ok_or(ModerationError::NotFound)?;

        let mut auto_deleted = false;
        if snapshot.now_active && snapshot.dislike_count >= self.config.auto_delete_dislikes {
            auto_deleted = self
                .store
                .mark_deleted(comment_id, DeletionReason::AutoDislike)
                .await?;
            if auto_deleted {
                tracing::info!(
                    comment_id,
                    dislikes = snapshot.dislike_count,
                    "comment auto-deleted after reaching the dislike threshold"
                );
            }
        }

        Ok(DislikeOutcome {
            disliked: snapshot.now_active,
            like_count: snapshot.like_count,
            dislike_count: snapshot.dislike_count,
            auto_deleted,
        })
    }

    /// Manual takedown.
    pub async fn delete_comment(&self, comment_id: &str) -> Result<bool, ModerationError> {
        self.store
            .mark_deleted(comment_id, DeletionReason::Manual)
            .await
    }
}

const LINK_MARKERS: &[&str] = &["http://", "https://", "www.", ".com", ".org", ".net"];

/// Script blocks the platform supports natively; characters in these ranges
/// never count as "special".
fn is_allowed_script(c: char) -> bool {
    matches!(c,
        '\u{0900}'..='\u{097F}' // Devanagari
        | '\u{0980}'..='\u{09FF}' // Bengali
        | '\u{0A00}'..='\u{0A7F}' // Gurmukhi
        | '\u{0A80}'..='\u{0AFF}' // Gujarati
        | '\u{0B00}'..='\u{0B7F}' // Oriya
        | '\u{0B80}'..='\u{0BFF}' // Tamil
        | '\u{0C00}'..='\u{0C7F}' // Telugu
        | '\u{0C80}'..='\u{0CFF}' // Kannada
        | '\u{0D00}'..='\u{0D7F}' // Malayalam
    )
}

fn is_special_char(c: char) -> bool {
    !(c.is_ascii_alphanumeric() || c == '_' || c.is_whitespace() || is_allowed_script(c))
}

/// Terms masked by the profanity filter. Whole-word matches only, so
/// "class" and "Scunthorpe" pass untouched.
const PROFANITY: &[&str] = &[
    "arse", "ass", "asshole", "bastard", "bitch", "bollocks", "crap", "damn", "dick", "douche",
    "fuck", "fucker", "fucking", "piss", "prick", "shit", "shitty", "slut", "twat", "wanker",
    "whore",
];

/// Replace profane words with asterisks of the same length, leaving the
/// rest of the text byte-for-byte intact.
fn mask_profanity(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut word = String::new();

    for c in text.chars() {
        if c.is_alphanumeric() || c == '\'' {
            word.push(c);
        } else {
            flush_word(&mut out, &mut word);
            out.push(c);
        }
    }
    flush_word(&mut out, &mut word);
    out
}

fn flush_word(out: &mut String, word: &mut String) {
    if word.is_empty() {
        return;
    }
    if PROFANITY.contains(&word.to_lowercase().as_str()) {
        out.extend(std::iter::repeat('*').take(word.chars().count()));
    } else {
        out.push_str(word);
    }
    word.clear();
}

/// Random 128-bit hex id. Collisions across a comment section are not a
/// realistic concern at this size.
fn generate_comment_id() -> String {
    format!("{:016x}{:016x}", rand::random::<u64>(), rand::random::<u64>())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use dashmap::DashMap;

    /// In-memory store for testing.
    struct MockCommentStore {
        comments: DashMap<String, CommentRecord>,
    }

    impl MockCommentStore {
        fn new() -> Self {
            Self {
                comments: DashMap::new(),
            }
        }
    }

    #[async_trait]
    impl CommentStore for MockCommentStore {
        async fn insert(&self, record: CommentRecord) -> Result<(), ModerationError> {
            self.comments.insert(record.id.clone(), record);
            Ok(())
        }

        async fn get(&self, comment_id: &str) -> Result<Option<CommentRecord>, ModerationError> {
            Ok(self.comments.get(comment_id).map(|c| c.clone()))
        }

        async fn list_visible(
            &self,
            video_id: &str,
        ) -> Result<Vec<CommentRecord>, ModerationError> {
            let mut visible: Vec<CommentRecord> = self
                .comments
                .iter()
                .filter(|c| c.video_id == video_id && !c.deleted)
                .map(|c| c.clone())
                .collect();
            visible.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(visible)
        }

        async fn toggle_like(
            &self,
            comment_id: &str,
            user: &str,
        ) -> Result<Option<ReactionSnapshot>, ModerationError> {
            let mut entry = match self.comments.get_mut(comment_id) {
                Some(entry) if !entry.deleted => entry,
                _ => return Ok(None),
            };
            let now_active = if entry.likes.remove(user) {
                false
            } else {
                entry.likes.insert(user.to_string());
                entry.dislikes.remove(user);
                true
            };
            Ok(Some(ReactionSnapshot {
                now_active,
                like_count: entry.likes.len(),
                dislike_count: entry.dislikes.len(),
            }))
        }

        async fn toggle_dislike(
            &self,
            comment_id: &str,
            user: &str,
        ) -> Result<Option<ReactionSnapshot>, ModerationError> {
            let mut entry = match self.comments.get_mut(comment_id) {
                Some(entry) if !entry.deleted => entry,
                _ => return Ok(None),
            };
            let now_active = if entry.dislikes.remove(user) {
                false
            } else {
                entry.dislikes.insert(user.to_string());
                entry.likes.remove(user);
                true
            };
            Ok(Some(ReactionSnapshot {
                now_active,
                like_count: entry.likes.len(),
                dislike_count: entry.dislikes.len(),
            }))
        }

        async fn mark_deleted(
            &self,
            comment_id: &str,
            reason: DeletionReason,
        ) -> Result<bool, ModerationError> {
            match self.comments.get_mut(comment_id) {
                Some(mut entry) if !entry.deleted => {
                    entry.deleted = true;
                    entry.deleted_reason = Some(reason);
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn save_translation(
            &self,
            comment_id: &str,
            language: &str,
            text: &str,
        ) -> Result<(), ModerationError> {
            let mut entry = self
                .comments
                .get_mut(comment_id)
                .ok_or(ModerationError::NotFound)?;
            entry
                .translations
                .insert(language.to_string(), text.to_string());
            Ok(())
        }
    }

    fn service() -> ModerationService<MockCommentStore> {
        ModerationService::new(MockCommentStore::new(), ModerationConfig::default())
    }

    #[test]
    fn normal_comments_pass() {
        let service = service();
        for text in [
            "Great video, thanks for sharing!",
            "This helped me a lot :)",
            "ab",
            "Nice edit at 2:30",
        ] {
            assert!(service.validate(text).is_ok(), "{text:?} should pass");
        }
    }

    #[test]
    fn length_bounds() {
        let service = service();
        assert_eq!(service.validate(""), Err(RejectReason::Empty));
        assert_eq!(service.validate("   "), Err(RejectReason::Empty));
        assert_eq!(service.validate("a"), Err(RejectReason::TooShort { min: 2 }));
        let long = "a b".repeat(400);
        assert_eq!(
            service.validate(&long),
            Err(RejectReason::TooLong { max: 1000 })
        );
    }

    #[test]
    fn special_character_run_is_rejected() {
        let service = service();
        assert_eq!(
            service.validate("look at this !!!$$$"),
            Err(RejectReason::SpecialCharRun { limit: 6 })
        );
        // Five in a row is still fine on the run check and under 50% here.
        assert!(service.validate("well done !!-!! keep it up").is_ok());
    }

    #[test]
    fn special_character_ratio_is_rejected() {
        let service = service();
        // 6 specials out of 10 chars, broken up so the run check passes.
        assert_eq!(
            service.validate("a$ %b ^& #@"),
            Err(RejectReason::SpecialCharRatio)
        );
        // Exactly half is allowed - the limit is strictly greater-than.
        assert!(service.validate("ab!!").is_ok());
    }

    #[test]
    fn native_script_comments_are_not_penalized() {
        let service = service();
        // Tamil and Devanagari, long enough that an unlisted script would
        // trip both special-character checks.
        assert!(service.validate("மிகவும் அருமையான காணொளி").is_ok());
        assert!(service.validate("बहुत अच्छा वीडियो है").is_ok());
    }

    #[test]
    fn repeated_characters_are_rejected() {
        let service = service();
        assert_eq!(
            service.validate("aaaaa"),
            Err(RejectReason::RepeatedCharacters { limit: 5 })
        );
        assert_eq!(
            service.validate("so coooool!"),
            Err(RejectReason::RepeatedCharacters { limit: 5 })
        );
        assert!(service.validate("aaaa okay").is_ok());
    }

    #[test]
    fn shouting_is_rejected_only_past_the_letter_floor() {
        let service = service();
        assert_eq!(
            service.validate("THIS IS THE BEST VIDEO EVER"),
            Err(RejectReason::ExcessiveCaps)
        );
        // Five or fewer letters: not judged.
        assert!(service.validate("WOW 4 me").is_ok());
        assert!(service.validate("Normal Sentence Case is fine").is_ok());
    }

    #[test]
    fn link_like_comments_are_rejected() {
        let service = service();
        for text in [
            "check https://spam.example/abc",
            "visit www.spam.example now",
            "go to spam.com please",
        ] {
            assert_eq!(service.validate(text), Err(RejectReason::LinkLike), "{text:?}");
        }
    }

    #[test]
    fn clean_strips_controls_masks_profanity_and_collapses_whitespace() {
        let service = service();
        assert_eq!(
            service.clean("  this   is\u{0007} a damn    good video  "),
            "this is a **** good video"
        );
        // Tabs and newlines collapse instead of being stripped outright.
        assert_eq!(service.clean("line one\n\tline two"), "line one line two");
        // Whole words only.
        assert_eq!(service.clean("classic assassin build"), "classic assassin build");
    }

    #[tokio::test]
    async fn submit_stores_cleaned_text_and_keeps_the_original() {
        let service = service();
        let record = service
            .submit("video-1", "maya", "what a damn  good video", None, None)
            .await
            .unwrap();

        assert_eq!(record.content, "what a **** good video");
        assert_eq!(record.original_content, "what a damn  good video");

        let stored = service.store.get(&record.id).await.unwrap().unwrap();
        assert_eq!(stored.content, record.content);
    }

    #[tokio::test]
    async fn submit_rejects_before_touching_the_store() {
        let service = service();
        let err = service
            .submit("video-1", "maya", "aaaaa", None, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ModerationError::Rejected(RejectReason::RepeatedCharacters { .. })
        ));
        assert!(service
            .comments_for_video("video-1")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn second_dislike_auto_deletes_with_reason() {
        let service = service();
        let record = service
            .submit("video-1", "maya", "controversial take", None, None)
            .await
            .unwrap();

        let outcome = service.register_dislike(&record.id, "user-a").await.unwrap();
        assert_eq!(outcome.dislike_count, 1);
        assert!(!outcome.auto_deleted);

        let outcome = service.register_dislike(&record.id, "user-b").await.unwrap();
        assert_eq!(outcome.dislike_count, 2);
        assert!(outcome.auto_deleted);

        let stored = service.store.get(&record.id).await.unwrap().unwrap();
        assert!(stored.deleted);
        assert_eq!(stored.deleted_reason, Some(DeletionReason::AutoDislike));
        assert_eq!(stored.deleted_reason.unwrap().as_str(), "auto_dislike");
    }

    #[tokio::test]
    async fn dislikes_on_a_deleted_comment_do_not_refire() {
        let service = service();
        let record = service
            .submit("video-1", "maya", "controversial take", None, None)
            .await
            .unwrap();

        service.register_dislike(&record.id, "user-a").await.unwrap();
        service.register_dislike(&record.id, "user-b").await.unwrap();

        // Deleted comments are gone as far as reactions are concerned.
        let err = service
            .register_dislike(&record.id, "user-c")
            .await
            .unwrap_err();
        assert!(matches!(err, ModerationError::NotFound));

        let stored = service.store.get(&record.id).await.unwrap().unwrap();
        assert_eq!(stored.deleted_reason, Some(DeletionReason::AutoDislike));
    }

    #[tokio::test]
    async fn toggling_a_dislike_off_does_not_count_toward_deletion() {
        let service = service();
        let record = service
            .submit("video-1", "maya", "mild take", None, None)
            .await
            .unwrap();

        service.register_dislike(&record.id, "user-a").await.unwrap();
        // Same user again: toggle off.
        let outcome = service.register_dislike(&record.id, "user-a").await.unwrap();
        assert!(!outcome.disliked);
        assert_eq!(outcome.dislike_count, 0);
        assert!(!outcome.auto_deleted);

        // On again plus a like from someone else never crosses the line.
        service.register_dislike(&record.id, "user-a").await.unwrap();
        service.register_like(&record.id, "user-b").await.unwrap();
        let stored = service.store.get(&record.id).await.unwrap().unwrap();
        assert!(!stored.deleted);
    }

    #[tokio::test]
    async fn like_and_dislike_are_mutually_exclusive() {
        let service = service();
        let record = service
            .submit("video-1", "maya", "nice video", None, None)
            .await
            .unwrap();

        service.register_dislike(&record.id, "user-a").await.unwrap();
        let snapshot = service.register_like(&record.id, "user-a").await.unwrap();
        assert!(snapshot.now_active);
        assert_eq!(snapshot.like_count, 1);
        assert_eq!(snapshot.dislike_count, 0);
    }

    #[tokio::test]
    async fn list_visible_hides_deleted_comments() {
        let service = service();
        let kept = service
            .submit("video-1", "maya", "staying around", None, None)
            .await
            .unwrap();
        let doomed = service
            .submit("video-1", "maya", "about to go", None, None)
            .await
            .unwrap();

        service.register_dislike(&doomed.id, "user-a").await.unwrap();
        service.register_dislike(&doomed.id, "user-b").await.unwrap();

        let visible = service.comments_for_video("video-1").await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, kept.id);
    }

    #[tokio::test]
    async fn manual_deletion_is_one_way() {
        let service = service();
        let record = service
            .submit("video-1", "maya", "going away", None, None)
            .await
            .unwrap();

        assert!(service.delete_comment(&record.id).await.unwrap());
        // Second delete reports that nothing happened.
        assert!(!service.delete_comment(&record.id).await.unwrap());

        let stored = service.store.get(&record.id).await.unwrap().unwrap();
        assert_eq!(stored.deleted_reason, Some(DeletionReason::Manual));
    }
}
