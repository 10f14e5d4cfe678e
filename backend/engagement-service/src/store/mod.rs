//! Store adapter consumed by the engagement engines.
//!
//! The trait abstracts every persistence operation the engines need so the
//! PostgreSQL implementation can be swapped for the in-memory one in tests.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{
    Comment, CommentCounts, CommentQuery, LikeTarget, NewComment, NewNotification, NewPost,
    Notification, NotificationKey, Post, PostChanges, PostCounts, PostQuery, TagWithCount,
    UserSummary,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgEngagementStore;

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Shared handle used by the engines
pub type SharedStore = Arc<dyn EngagementStore>;

#[derive(Error, Debug)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write (duplicate like)
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// A referenced row is missing, or the row is still referenced
    #[error("Foreign key violated: {0}")]
    ForeignKeyViolation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation(_))
    }
}

#[async_trait]
pub trait EngagementStore: Send + Sync {
    /// Cheap round-trip used by readiness checks
    async fn ping(&self) -> StoreResult<()>;

    // ---- users ----

    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<UserSummary>>;

    async fn find_users(&self, user_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, UserSummary>>;

    // ---- posts ----

    async fn find_post(&self, post_id: Uuid) -> StoreResult<Option<Post>>;

    /// Insert a post, creating lower-cased tags on first use
    async fn insert_post(&self, new_post: NewPost) -> StoreResult<Post>;

    /// Apply changes; returns None when the post does not exist
    async fn update_post(&self, post_id: Uuid, changes: PostChanges) -> StoreResult<Option<Post>>;

    /// Delete a post together with its comments, likes and notifications
    async fn delete_post(&self, post_id: Uuid) -> StoreResult<u64>;

    /// Returns the requested page and the total number of matching posts
    async fn list_posts(&self, query: &PostQuery) -> StoreResult<(Vec<Post>, i64)>;

    async fn post_counts(&self, post_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, PostCounts>>;

    /// Tags with post counts, most used first
    async fn list_tags(&self) -> StoreResult<Vec<TagWithCount>>;

    // ---- likes ----

    async fn like_exists(&self, user_id: Uuid, target: LikeTarget) -> StoreResult<bool>;

    /// Fails with `StoreError::UniqueViolation` when the pairing already exists
    async fn insert_like(&self, user_id: Uuid, target: LikeTarget) -> StoreResult<()>;

    async fn delete_like(&self, user_id: Uuid, target: LikeTarget) -> StoreResult<u64>;

    // ---- comments ----

    async fn find_comment(&self, comment_id: Uuid) -> StoreResult<Option<Comment>>;

    async fn insert_comment(&self, new_comment: NewComment) -> StoreResult<Comment>;

    async fn update_comment_content(
        &self,
        comment_id: Uuid,
        content: &str,
    ) -> StoreResult<Option<Comment>>;

    /// Delete one comment; replies further down the chain go with it
    async fn delete_comment(&self, comment_id: Uuid) -> StoreResult<u64>;

    /// Delete direct replies of a comment
    async fn delete_replies(&self, parent_id: Uuid) -> StoreResult<u64>;

    /// Top-level comments of a post, oldest first
    async fn list_top_level_comments(&self, post_id: Uuid) -> StoreResult<Vec<Comment>>;

    /// Direct replies of the given parents, oldest first
    async fn list_replies(&self, parent_ids: &[Uuid]) -> StoreResult<Vec<Comment>>;

    /// Comments written by a user, newest first
    async fn list_user_comments(&self, user_id: Uuid) -> StoreResult<Vec<Comment>>;

    /// Returns the requested page (oldest first) and the total
    async fn query_comments(&self, query: &CommentQuery) -> StoreResult<(Vec<Comment>, i64)>;

    async fn comment_counts(
        &self,
        comment_ids: &[Uuid],
    ) -> StoreResult<HashMap<Uuid, CommentCounts>>;

    // ---- notifications ----

    async fn insert_notification(&self, new_notification: NewNotification)
        -> StoreResult<Notification>;

    /// Most recent notification matching `key` created at or after `since`
    async fn find_recent_notification(
        &self,
        key: &NotificationKey,
        since: DateTime<Utc>,
    ) -> StoreResult<Option<Notification>>;

    async fn delete_notifications(&self, key: &NotificationKey) -> StoreResult<u64>;

    /// Recipient's notifications, newest first
    async fn list_notifications(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Notification>>;

    async fn count_notifications(&self, user_id: Uuid, unread_only: bool) -> StoreResult<i64>;

    /// Scoped by recipient; zero rows when the pair does not match
    async fn mark_notification_read(&self, notification_id: Uuid, user_id: Uuid)
        -> StoreResult<u64>;

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> StoreResult<u64>;

    /// Scoped by recipient; zero rows when the pair does not match
    async fn delete_notification(&self, notification_id: Uuid, user_id: Uuid) -> StoreResult<u64>;
}
