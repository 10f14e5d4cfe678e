use serde::Serialize;
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use super::SharedEventSink;
use crate::domain::{
    Comment, CommentQuery, CommentView, EngagementEvent, NewComment, Pagination,
};
use crate::error::{AppError, Result};
use crate::metrics;
use crate::store::{SharedStore, StoreError};

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Serialize)]
pub struct CommentPage {
    pub comments: Vec<CommentView>,
    pub pagination: Pagination,
}

/// Comment threads: one level of replies hanging off a parent pointer.
///
/// Writes publish `CommentCreated` / `ReplyCreated` after the comment row is
/// stored. Deleting a comment removes its direct replies first and then the
/// comment; the two deletes are separate store calls.
pub struct ThreadManager {
    store: SharedStore,
    events: SharedEventSink,
}

impl ThreadManager {
    pub fn new(store: SharedStore, events: SharedEventSink) -> Self {
        Self { store, events }
    }

    pub async fn create_comment(
        &self,
        actor_id: Uuid,
        post_id: Uuid,
        content: &str,
        parent_id: Option<Uuid>,
    ) -> Result<CommentView> {
        let content = validate_content(content)?;

        if self.store.find_post(post_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Post {} not found", post_id)));
        }

        if let Some(parent_id) = parent_id {
            let parent = self.store.find_comment(parent_id).await?.ok_or_else(|| {
                AppError::NotFound(format!("Parent comment {} not found", parent_id))
            })?;
            if parent.post_id != post_id {
                return Err(AppError::InvalidRelation(
                    "Parent comment must be on the same post".to_string(),
                ));
            }
        }

        let comment = self
            .store
            .insert_comment(NewComment {
                user_id: actor_id,
                post_id,
                parent_id,
                content,
            })
            .await
            .map_err(|err| match err {
                // Post or parent removed between the checks and the insert
                StoreError::ForeignKeyViolation(constraint) => {
                    AppError::NotFound(format!("Referenced row missing ({})", constraint))
                }
                other => other.into(),
            })?;

        metrics::record_comment_operation("create");
        info!(
            comment_id = %comment.id,
            post_id = %comment.post_id,
            parent_id = ?comment.parent_id,
            actor_id = %actor_id,
            "comment created"
        );

        let event = match comment.parent_id {
            Some(parent_id) => EngagementEvent::ReplyCreated {
                parent_id,
                reply_id: comment.id,
                actor_id,
            },
            None => EngagementEvent::CommentCreated {
                post_id: comment.post_id,
                comment_id: comment.id,
                actor_id,
            },
        };
        self.events.publish(event).await;

        self.single_view(comment).await
    }

    /// Owner-only body edit; no notification
    pub async fn update_comment(
        &self,
        actor_id: Uuid,
        comment_id: Uuid,
        content: &str,
    ) -> Result<CommentView> {
        let content = validate_content(content)?;
        let existing = self.owned_comment(actor_id, comment_id, "update").await?;

        let updated = self
            .store
            .update_comment_content(existing.id, &content)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment {} not found", comment_id)))?;

        metrics::record_comment_operation("update");
        self.single_view(updated).await
    }

    /// Owner-only delete. Returns the number of comment rows removed
    /// (direct replies plus the comment itself).
    pub async fn delete_comment(&self, actor_id: Uuid, comment_id: Uuid) -> Result<u64> {
        let comment = self.owned_comment(actor_id, comment_id, "delete").await?;

        let replies = self.store.delete_replies(comment.id).await?;
        let own = self.store.delete_comment(comment.id).await?;

        metrics::record_comment_operation("delete");
        info!(
            comment_id = %comment.id,
            actor_id = %actor_id,
            replies_removed = replies,
            "comment deleted"
        );
        Ok(replies + own)
    }

    pub async fn get_comment(&self, comment_id: Uuid) -> Result<CommentView> {
        let comment = self
            .store
            .find_comment(comment_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment {} not found", comment_id)))?;
        self.single_view(comment).await
    }

    /// Top-level comments of a post, oldest first, each with its replies
    pub async fn list_by_post(&self, post_id: Uuid) -> Result<Vec<CommentView>> {
        if self.store.find_post(post_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Post {} not found", post_id)));
        }
        let comments = self.store.list_top_level_comments(post_id).await?;
        self.build_views(comments, true).await
    }

    /// Direct replies of a comment, oldest first
    pub async fn list_replies(&self, parent_id: Uuid) -> Result<Vec<CommentView>> {
        if self.store.find_comment(parent_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Comment {} not found", parent_id)));
        }
        let replies = self.store.list_replies(&[parent_id]).await?;
        self.build_views(replies, false).await
    }

    pub async fn list_comments(
        &self,
        post_id: Option<Uuid>,
        user_id: Option<Uuid>,
        page: i64,
        limit: i64,
    ) -> Result<CommentPage> {
        let page = page.max(1);
        let limit = if limit <= 0 {
            DEFAULT_PAGE_SIZE
        } else {
            limit.min(MAX_PAGE_SIZE)
        };

        let (comments, total) = self
            .store
            .query_comments(&CommentQuery {
                post_id,
                user_id,
                limit,
                offset: Pagination::offset(page, limit),
            })
            .await?;

        Ok(CommentPage {
            comments: self.build_views(comments, true).await?,
            pagination: Pagination::new(page, limit, total),
        })
    }

    /// A user's comments, newest first
    pub async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<CommentView>> {
        let comments = self.store.list_user_comments(user_id).await?;
        self.build_views(comments, false).await
    }

    async fn owned_comment(&self, actor_id: Uuid, comment_id: Uuid, action: &str) -> Result<Comment> {
        let comment = self
            .store
            .find_comment(comment_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment {} not found", comment_id)))?;
        if comment.user_id != actor_id {
            return Err(AppError::Forbidden(format!(
                "You can only {} your own comments",
                action
            )));
        }
        Ok(comment)
    }

    async fn single_view(&self, comment: Comment) -> Result<CommentView> {
        let mut views = self.build_views(vec![comment], true).await?;
        views
            .pop()
            .ok_or_else(|| AppError::Internal("comment view assembly returned nothing".into()))
    }

    /// Attach authors and counts; with `with_replies`, also attach the direct
    /// replies of every entry.
    async fn build_views(
        &self,
        comments: Vec<Comment>,
        with_replies: bool,
    ) -> Result<Vec<CommentView>> {
        if comments.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = comments.iter().map(|c| c.id).collect();
        let replies = if with_replies {
            self.store.list_replies(&ids).await?
        } else {
            Vec::new()
        };

        let mut counted: Vec<Uuid> = ids.clone();
        counted.extend(replies.iter().map(|r| r.id));
        let counts = self.store.comment_counts(&counted).await?;

        let mut author_ids: Vec<Uuid> = comments
            .iter()
            .chain(replies.iter())
            .map(|c| c.user_id)
            .collect();
        author_ids.sort();
        author_ids.dedup();
        let authors = self.store.find_users(&author_ids).await?;

        let leaf = |comment: Comment| CommentView {
            author: authors.get(&comment.user_id).cloned(),
            counts: counts.get(&comment.id).copied().unwrap_or_default(),
            replies: None,
            comment,
        };

        let mut replies_by_parent: HashMap<Uuid, Vec<CommentView>> = HashMap::new();
        for reply in replies {
            if let Some(parent_id) = reply.parent_id {
                replies_by_parent
                    .entry(parent_id)
                    .or_default()
                    .push(leaf(reply));
            }
        }

        Ok(comments
            .into_iter()
            .map(|comment| {
                let id = comment.id;
                let mut view = leaf(comment);
                if with_replies {
                    view.replies = Some(replies_by_parent.remove(&id).unwrap_or_default());
                }
                view
            })
            .collect())
    }
}

fn validate_content(content: &str) -> Result<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(
            "Comment content must not be empty".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}
