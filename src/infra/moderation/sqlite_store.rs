// SQLite implementation of CommentStore.
//
// Reaction sets, translations and the location are stored as JSON text
// columns. Toggles run inside an IMMEDIATE transaction on a single
// connection, which gives the port the per-comment atomicity it asks for.

use crate::core::location::Location;
use crate::core::moderation::{
    CommentRecord, CommentStore, DeletionReason, ModerationError, ReactionSnapshot,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

pub struct SqliteCommentStore {
    pool: Pool<Sqlite>,
}

impl SqliteCommentStore {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure the file exists if it's a file path
        let path_str = database_url.trim_start_matches("sqlite://");
        if !database_url.contains(":memory:") && !Path::new(path_str).exists() {
            if let Some(parent) = Path::new(path_str).parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::File::create(path_str)?;
        }

        let conn_str = if database_url.starts_with("sqlite:") {
            database_url.to_string()
        } else {
            format!("sqlite://{}", database_url)
        };

        let pool = SqlitePoolOptions::new().connect(&conn_str).await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS comments (
                id TEXT PRIMARY KEY,
                video_id TEXT NOT NULL,
                author TEXT NOT NULL,
                content TEXT NOT NULL,
                original_content TEXT NOT NULL,
                language TEXT,
                location TEXT,
                likes TEXT NOT NULL DEFAULT '[]',
                dislikes TEXT NOT NULL DEFAULT '[]',
                translations TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL,
                deleted INTEGER NOT NULL DEFAULT 0,
                deleted_reason TEXT
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_comments_video
            ON comments (video_id, created_at DESC);
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn storage_err(e: impl std::fmt::Display) -> ModerationError {
    ModerationError::StorageError(e.to_string())
}

fn parse_reason(raw: &str) -> Option<DeletionReason> {
    match raw {
        "auto_dislike" => Some(DeletionReason::AutoDislike),
        "special_chars" => Some(DeletionReason::SpecialChars),
        "manual" => Some(DeletionReason::Manual),
        _ => None,
    }
}

fn row_to_record(row: &SqliteRow) -> Result<CommentRecord, ModerationError> {
    let likes: BTreeSet<String> =
        serde_json::from_str(row.get::<&str, _>("likes")).map_err(storage_err)?;
    let dislikes: BTreeSet<String> =
        serde_json::from_str(row.get::<&str, _>("dislikes")).map_err(storage_err)?;
    let translations: BTreeMap<String, String> =
        serde_json::from_str(row.get::<&str, _>("translations")).map_err(storage_err)?;
    let location: Option<Location> = match row.get::<Option<&str>, _>("location") {
        Some(raw) => Some(serde_json::from_str(raw).map_err(storage_err)?),
        None => None,
    };
    let deleted_reason = row
        .get::<Option<&str>, _>("deleted_reason")
        .and_then(parse_reason);

    Ok(CommentRecord {
        id: row.get("id"),
        video_id: row.get("video_id"),
        author: row.get("author"),
        content: row.get("content"),
        original_content: row.get("original_content"),
        language: row.get("language"),
        location,
        likes,
        dislikes,
        translations,
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
        deleted: row.get::<i64, _>("deleted") != 0,
        deleted_reason,
    })
}

#[async_trait]
impl CommentStore for SqliteCommentStore {
    async fn insert(&self, record: CommentRecord) -> Result<(), ModerationError> {
        let likes = serde_json::to_string(&record.likes).map_err(storage_err)?;
        let dislikes = serde_json::to_string(&record.dislikes).map_err(storage_err)?;
        let translations = serde_json::to_string(&record.translations).map_err(storage_err)?;
        let location = match &record.location {
            Some(location) => Some(serde_json::to_string(location).map_err(storage_err)?),
            None => None,
        };

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO comments
                (id, video_id, author, content, original_content, language,
                 location, likes, dislikes, translations, created_at,
                 deleted, deleted_reason)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.video_id)
        .bind(&record.author)
        .bind(&record.content)
        .bind(&record.original_content)
        .bind(&record.language)
        .bind(location)
        .bind(likes)
        .bind(dislikes)
        .bind(translations)
        .bind(record.created_at)
        .bind(record.deleted as i64)
        .bind(record.deleted_reason.map(|r| r.as_str()))
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }

    async fn get(&self, comment_id: &str) -> Result<Option<CommentRecord>, ModerationError> {
        let row = sqlx::query("SELECT * FROM comments WHERE id = ?")
            .bind(comment_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn list_visible(&self, video_id: &str) -> Result<Vec<CommentRecord>, ModerationError> {
        let rows = sqlx::query(
            "SELECT * FROM comments WHERE video_id = ? AND deleted = 0 ORDER BY created_at DESC",
        )
        .bind(video_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        rows.iter().map(row_to_record).collect()
    }

    async fn toggle_like(
        &self,
        comment_id: &str,
        user: &str,
    ) -> Result<Option<ReactionSnapshot>, ModerationError> {
        self.toggle_reaction(comment_id, user, true).await
    }

    async fn toggle_dislike(
        &self,
        comment_id: &str,
        user: &str,
    ) -> Result<Option<ReactionSnapshot>, ModerationError> {
        self.toggle_reaction(comment_id, user, false).await
    }

    async fn mark_deleted(
        &self,
        comment_id: &str,
        reason: DeletionReason,
    ) -> Result<bool, ModerationError> {
        // The `deleted = 0` guard makes the transition one-way and tells the
        // caller whether this call performed it.
        let result = sqlx::query(
            "UPDATE comments SET deleted = 1, deleted_reason = ? WHERE id = ? AND deleted = 0",
        )
        .bind(reason.as_str())
        .bind(comment_id)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn save_translation(
        &self,
        comment_id: &str,
        language: &str,
        text: &str,
    ) -> Result<(), ModerationError> {
        let mut conn = self.pool.acquire().await.map_err(storage_err)?;

        sqlx::query("BEGIN IMMEDIATE")
            .execute(&mut *conn)
            .await
            .map_err(storage_err)?;

        let result = async {
            let row = sqlx::query("SELECT translations FROM comments WHERE id = ?")
                .bind(comment_id)
                .fetch_optional(&mut *conn)
                .await
                .map_err(storage_err)?
                .ok_or(ModerationError::NotFound)?;

            let mut translations: BTreeMap<String, String> =
                serde_json::from_str(row.get::<&str, _>("translations")).map_err(storage_err)?;
            translations.insert(language.to_string(), text.to_string());

            sqlx::query("UPDATE comments SET translations = ? WHERE id = ?")
                .bind(serde_json::to_string(&translations).map_err(storage_err)?)
                .bind(comment_id)
                .execute(&mut *conn)
                .await
                .map_err(storage_err)?;

            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                sqlx::query("COMMIT")
                    .execute(&mut *conn)
                    .await
                    .map_err(storage_err)?;
                Ok(())
            }
            Err(err) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                Err(err)
            }
        }
    }
}

impl SqliteCommentStore {
    async fn toggle_reaction(
        &self,
        comment_id: &str,
        user: &str,
        like: bool,
    ) -> Result<Option<ReactionSnapshot>, ModerationError> {
        let mut conn = self.pool.acquire().await.map_err(storage_err)?;

        sqlx::query("BEGIN IMMEDIATE")
            .execute(&mut *conn)
            .await
            .map_err(storage_err)?;

        let result = async {
            let row = sqlx::query("SELECT likes, dislikes, deleted FROM comments WHERE id = ?")
                .bind(comment_id)
                .fetch_optional(&mut *conn)
                .await
                .map_err(storage_err)?;

            let row = match row {
                Some(row) => row,
                None => return Ok(None),
            };
            if row.get::<i64, _>("deleted") != 0 {
                return Ok(None);
            }

            let mut likes: BTreeSet<String> =
                serde_json::from_str(row.get::<&str, _>("likes")).map_err(storage_err)?;
            let mut dislikes: BTreeSet<String> =
                serde_json::from_str(row.get::<&str, _>("dislikes")).map_err(storage_err)?;

            let (target, opposite) = if like {
                (&mut likes, &mut dislikes)
            } else {
                (&mut dislikes, &mut likes)
            };

            let now_active = if target.contains(user) {
                target.remove(user);
                false
            } else {
                target.insert(user.to_string());
                opposite.remove(user);
                true
            };

            let snapshot = ReactionSnapshot {
                now_active,
                like_count: likes.len(),
                dislike_count: dislikes.len(),
            };

            sqlx::query("UPDATE comments SET likes = ?, dislikes = ? WHERE id = ?")
                .bind(serde_json::to_string(&likes).map_err(storage_err)?)
                .bind(serde_json::to_string(&dislikes).map_err(storage_err)?)
                .bind(comment_id)
                .execute(&mut *conn)
                .await
                .map_err(storage_err)?;

            Ok(Some(snapshot))
        }
        .await;

        match result {
            Ok(snapshot) => {
                sqlx::query("COMMIT")
                    .execute(&mut *conn)
                    .await
                    .map_err(storage_err)?;
                Ok(snapshot)
            }
            Err(err) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                Err(err)
            }
        }
    }
}
