// Moderation domain models - comment records and the outcomes of the
// moderation pipeline.
//
// These are pure domain types; the storage backend converts them to and
// from whatever representation it uses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::core::location::Location;

/// Why a comment was rejected at submission.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    Empty,
    TooShort { min: usize },
    TooLong { max: usize },
    /// A run of consecutive special characters at or past the limit.
    SpecialCharRun { limit: usize },
    /// More than half of the text is special characters.
    SpecialCharRatio,
    /// A single character repeated too many times in a row.
    RepeatedCharacters { limit: usize },
    /// Mostly-uppercase shouting.
    ExcessiveCaps,
    /// URL-like content.
    LinkLike,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::Empty => write!(f, "comment is empty"),
            RejectReason::TooShort { min } => {
                write!(f, "comment is shorter than {min} characters")
            }
            RejectReason::TooLong { max } => {
                write!(f, "comment is longer than {max} characters")
            }
            RejectReason::SpecialCharRun { limit } => {
                write!(f, "{limit} or more special characters in a row")
            }
            RejectReason::SpecialCharRatio => {
                write!(f, "more than half of the comment is special characters")
            }
            RejectReason::RepeatedCharacters { limit } => {
                write!(f, "a character repeats {limit} or more times in a row")
            }
            RejectReason::ExcessiveCaps => write!(f, "too much uppercase"),
            RejectReason::LinkLike => write!(f, "links are not allowed in comments"),
        }
    }
}

/// Why a stored comment was hidden. One-way: a deleted comment never comes
/// back and its reason never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionReason {
    AutoDislike,
    SpecialChars,
    Manual,
}

impl DeletionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeletionReason::AutoDislike => "auto_dislike",
            DeletionReason::SpecialChars => "special_chars",
            DeletionReason::Manual => "manual",
        }
    }
}

/// A stored comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: String,
    pub video_id: String,
    pub author: String,
    /// Cleaned text shown to readers.
    pub content: String,
    /// Text exactly as submitted, kept for audits and re-cleaning.
    pub original_content: String,
    /// Detected or declared source language, when known.
    pub language: Option<String>,
    pub location: Option<Location>,
    pub likes: BTreeSet<String>,
    pub dislikes: BTreeSet<String>,
    /// Machine translations keyed by target language code. Entries are never
    /// invalidated - the source text is immutable once stored.
    pub translations: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub deleted: bool,
    pub deleted_reason: Option<DeletionReason>,
}

impl CommentRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: String,
        video_id: String,
        author: String,
        content: String,
        original_content: String,
        language: Option<String>,
        location: Option<Location>,
    ) -> Self {
        Self {
            id,
            video_id,
            author,
            content,
            original_content,
            language,
            location,
            likes: BTreeSet::new(),
            dislikes: BTreeSet::new(),
            translations: BTreeMap::new(),
            created_at: Utc::now(),
            deleted: false,
            deleted_reason: None,
        }
    }
}

/// Result of a like/dislike toggle, read under the store's per-comment
/// serialization so the counts are exact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionSnapshot {
    /// Whether the reaction is active after the toggle (false = removed).
    pub now_active: bool,
    pub like_count: usize,
    pub dislike_count: usize,
}

/// What a dislike did, including whether it tripped auto-deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DislikeOutcome {
    pub disliked: bool,
    pub like_count: usize,
    pub dislike_count: usize,
    pub auto_deleted: bool,
}

/// Tunables for the moderation pipeline.
#[derive(Debug, Clone)]
pub struct ModerationConfig {
    /// Minimum comment length in characters.
    pub min_length: usize,
    /// Maximum comment length in characters.
    pub max_length: usize,
    /// Reject at this many consecutive special characters.
    pub special_run_limit: usize,
    /// Reject above this special-character ratio.
    pub special_ratio_limit: f64,
    /// Reject at this many consecutive repeats of one character.
    pub repeat_limit: usize,
    /// Reject above this uppercase ratio...
    pub caps_ratio_limit: f64,
    /// ...but only when there are more than this many letters.
    pub caps_min_letters: usize,
    /// Dislike count at which a comment is auto-deleted.
    pub auto_delete_dislikes: usize,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            min_length: 2,
            max_length: 1000,
            special_run_limit: 6,
            special_ratio_limit: 0.5,
            repeat_limit: 5,
            caps_ratio_limit: 0.7,
            caps_min_letters: 5,
            auto_delete_dislikes: 2,
        }
    }
}
