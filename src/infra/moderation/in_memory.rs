// In-memory implementation of CommentStore.
//
// DashMap's per-entry locking provides the per-comment atomicity the port
// requires: every toggle runs under `get_mut`, so the snapshot it returns
// is exact.

use crate::core::moderation::{
    CommentRecord, CommentStore, DeletionReason, ModerationError, ReactionSnapshot,
};
use async_trait::async_trait;
use dashmap::DashMap;

pub struct InMemoryCommentStore {
    comments: DashMap<String, CommentRecord>,
}

impl InMemoryCommentStore {
    pub fn new() -> Self {
        Self {
            comments: DashMap::new(),
        }
    }
}

impl Default for InMemoryCommentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommentStore for InMemoryCommentStore {
    async fn insert(&self, record: CommentRecord) -> Result<(), ModerationError> {
        self.comments.insert(record.id.clone(), record);
        Ok(())
    }

    async fn get(&self, comment_id: &str) -> Result<Option<CommentRecord>, ModerationError> {
        Ok(self.comments.get(comment_id).map(|entry| entry.clone()))
    }

    async fn list_visible(&self, video_id: &str) -> Result<Vec<CommentRecord>, ModerationError> {
        let mut comments: Vec<CommentRecord> = self
            .comments
            .iter()
            .filter(|entry| entry.video_id == video_id && !entry.deleted)
            .map(|entry| entry.clone())
            .collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(comments)
    }

    async fn toggle_like(
        &self,
        comment_id: &str,
        user: &str,
    ) -> Result<Option<ReactionSnapshot>, ModerationError> {
        let mut entry = match self.comments.get_mut(comment_id) {
            Some(entry) => entry,
            None => return Ok(None),
        };
        if entry.deleted {
            return Ok(None);
        }

        let now_active = if entry.likes.contains(user) {
            entry.likes.remove(user);
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
            Some(entry) => entry,
            None => return Ok(None),
        };
        if entry.deleted {
            return Ok(None);
        }

        let now_active = if entry.dislikes.contains(user) {
            entry.dislikes.remove(user);
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
        let mut entry = match self.comments.get_mut(comment_id) {
            Some(entry) => entry,
            None => return Ok(false),
        };
        if entry.deleted {
            return Ok(false);
        }

        entry.deleted = true;
        entry.deleted_reason = Some(reason);
        Ok(true)
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
