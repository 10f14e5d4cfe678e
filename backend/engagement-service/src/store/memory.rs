//! In-process store with the same uniqueness and reference rules as the
//! PostgreSQL schema. Used by the test-suite and `STORE_BACKEND=memory`.
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{EngagementStore, StoreError, StoreResult};
use crate::domain::{
    Comment, CommentCounts, CommentQuery, LikeTarget, NewComment, NewNotification, NewPost,
    Notification, NotificationKey, Post, PostChanges, PostCounts, PostQuery, PostSortColumn,
    SortOrder, Tag, TagWithCount, UserSummary,
};

#[derive(Default)]
struct State {
    users: HashMap<Uuid, UserSummary>,
    posts: Vec<Post>,
    tags: Vec<Tag>,
    /// (user_id, post_id)
    post_likes: HashSet<(Uuid, Uuid)>,
    /// (user_id, comment_id)
    comment_likes: HashSet<(Uuid, Uuid)>,
    comments: Vec<Comment>,
    notifications: Vec<Notification>,
}

impl State {
    fn post_exists(&self, post_id: Uuid) -> bool {
        self.posts.iter().any(|p| p.id == post_id)
    }

    fn comment_exists(&self, comment_id: Uuid) -> bool {
        self.comments.iter().any(|c| c.id == comment_id)
    }

    fn require_user(&self, user_id: Uuid, constraint: &str) -> StoreResult<()> {
        if self.users.contains_key(&user_id) {
            Ok(())
        } else {
            Err(StoreError::ForeignKeyViolation(constraint.to_string()))
        }
    }

    fn resolve_tags(&mut self, names: &[String]) -> Vec<Tag> {
        let mut resolved: Vec<Tag> = Vec::new();
        for name in names {
            let name = name.trim().to_lowercase();
            if name.is_empty() || resolved.iter().any(|t| t.name == name) {
                continue;
            }
            let tag = match self.tags.iter().find(|t| t.name == name) {
                Some(tag) => tag.clone(),
                None => {
                    let tag = Tag {
                        id: Uuid::new_v4(),
                        name,
                    };
                    self.tags.push(tag.clone());
                    tag
                }
            };
            resolved.push(tag);
        }
        resolved
    }

    /// Remove comments (and everything below them in the chain) plus their likes
    /// and notifications. Returns how many of `roots` were removed.
    fn remove_comments(&mut self, roots: &[Uuid]) -> u64 {
        let mut doomed: HashSet<Uuid> = roots
            .iter()
            .copied()
            .filter(|id| self.comment_exists(*id))
            .collect();
        let removed_roots = doomed.len() as u64;

        loop {
            let children: Vec<Uuid> = self
                .comments
                .iter()
                .filter(|c| c.parent_id.map_or(false, |p| doomed.contains(&p)))
                .map(|c| c.id)
                .filter(|id| !doomed.contains(id))
                .collect();
            if children.is_empty() {
                break;
            }
            doomed.extend(children);
        }

        self.comments.retain(|c| !doomed.contains(&c.id));
        self.comment_likes.retain(|(_, cid)| !doomed.contains(cid));
        self.notifications
            .retain(|n| n.comment_id.map_or(true, |cid| !doomed.contains(&cid)));
        removed_roots
    }
}

/// In-memory `EngagementStore`
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
    fail_notification_writes: AtomicBool,
    stale_like_reads: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Users are owned by the identity service; seed them here.
    pub async fn insert_user(&self, user: UserSummary) {
        self.state.write().await.users.insert(user.id, user);
    }

    /// Make every notification insert fail with `StoreError::Unavailable`
    pub fn fail_notification_writes(&self, fail: bool) {
        self.fail_notification_writes.store(fail, Ordering::SeqCst);
    }

    /// Make `like_exists` always answer false, as a read that lost the race
    /// against a concurrent insert would
    pub fn stale_like_reads(&self, stale: bool) {
        self.stale_like_reads.store(stale, Ordering::SeqCst);
    }

    /// Shift every stored notification into the past
    pub async fn backdate_notifications(&self, by: Duration) {
        let mut state = self.state.write().await;
        for notification in state.notifications.iter_mut() {
            notification.created_at -= by;
        }
    }

    /// Shift a post's creation time into the past
    pub async fn backdate_post(&self, post_id: Uuid, by: Duration) {
        let mut state = self.state.write().await;
        if let Some(post) = state.posts.iter_mut().find(|p| p.id == post_id) {
            post.created_at -= by;
        }
    }

    /// Number of like rows for a target
    pub async fn like_rows(&self, target: LikeTarget) -> usize {
        let state = self.state.read().await;
        match target {
            LikeTarget::Post(id) => state.post_likes.iter().filter(|(_, p)| *p == id).count(),
            LikeTarget::Comment(id) => {
                state.comment_likes.iter().filter(|(_, c)| *c == id).count()
            }
        }
    }

    pub async fn comment_rows(&self) -> usize {
        self.state.read().await.comments.len()
    }

    pub async fn notification_rows(&self) -> usize {
        self.state.read().await.notifications.len()
    }
}

fn page<T>(items: Vec<T>, limit: i64, offset: i64) -> Vec<T> {
    items
        .into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

#[async_trait]
impl EngagementStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<UserSummary>> {
        Ok(self.state.read().await.users.get(&user_id).cloned())
    }

    async fn find_users(&self, user_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, UserSummary>> {
        let state = self.state.read().await;
        Ok(user_ids
            .iter()
            .filter_map(|id| state.users.get(id).map(|u| (*id, u.clone())))
            .collect())
    }

    async fn find_post(&self, post_id: Uuid) -> StoreResult<Option<Post>> {
        let state = self.state.read().await;
        Ok(state.posts.iter().find(|p| p.id == post_id).cloned())
    }

    async fn insert_post(&self, new_post: NewPost) -> StoreResult<Post> {
        let mut state = self.state.write().await;
        state.require_user(new_post.user_id, "posts_user_id_fkey")?;

        let now = Utc::now();
        let tags = state.resolve_tags(&new_post.tags);
        let post = Post {
            id: Uuid::new_v4(),
            user_id: new_post.user_id,
            title: new_post.title,
            content: new_post.content,
            status: new_post.status,
            created_at: now,
            updated_at: now,
            tags,
            image_urls: Vec::new(),
        };
        state.posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, post_id: Uuid, changes: PostChanges) -> StoreResult<Option<Post>> {
        let mut state = self.state.write().await;
        let tags = changes.tags.as_ref().map(|names| state.resolve_tags(names));

        let Some(post) = state.posts.iter_mut().find(|p| p.id == post_id) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            post.title = title;
        }
        if let Some(content) = changes.content {
            post.content = content;
        }
        if let Some(status) = changes.status {
            post.status = status;
        }
        if let Some(tags) = tags {
            post.tags = tags;
        }
        post.updated_at = Utc::now();
        Ok(Some(post.clone()))
    }

    async fn delete_post(&self, post_id: Uuid) -> StoreResult<u64> {
        let mut state = self.state.write().await;
        if !state.post_exists(post_id) {
            return Ok(0);
        }

        let comment_ids: Vec<Uuid> = state
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .map(|c| c.id)
            .collect();
        state.remove_comments(&comment_ids);
        state.post_likes.retain(|(_, pid)| *pid != post_id);
        state.notifications.retain(|n| n.post_id != Some(post_id));
        state.posts.retain(|p| p.id != post_id);
        Ok(1)
    }

    async fn list_posts(&self, query: &PostQuery) -> StoreResult<(Vec<Post>, i64)> {
        let state = self.state.read().await;
        let tag = query.tag.as_ref().map(|t| t.to_lowercase());
        let search = query.search.as_ref().map(|s| s.to_lowercase());

        let mut matching: Vec<Post> = state
            .posts
            .iter()
            .filter(|p| query.status.map_or(true, |s| p.status == s))
            .filter(|p| query.user_id.map_or(true, |u| p.user_id == u))
            .filter(|p| {
                search.as_ref().map_or(true, |s| {
                    p.title.to_lowercase().contains(s) || p.content.to_lowercase().contains(s)
                })
            })
            .filter(|p| {
                tag.as_ref()
                    .map_or(true, |t| p.tags.iter().any(|pt| pt.name.to_lowercase() == *t))
            })
            .cloned()
            .collect();

        matching.sort_by(|a, b| {
            let ordering = match query.sort {
                PostSortColumn::CreatedAt => a.created_at.cmp(&b.created_at),
                PostSortColumn::UpdatedAt => a.updated_at.cmp(&b.updated_at),
                PostSortColumn::Title => a.title.cmp(&b.title),
            };
            match query.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let total = matching.len() as i64;
        Ok((page(matching, query.limit, query.offset), total))
    }

    async fn post_counts(&self, post_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, PostCounts>> {
        let state = self.state.read().await;
        Ok(post_ids
            .iter()
            .map(|id| {
                let counts = PostCounts {
                    comments: state.comments.iter().filter(|c| c.post_id == *id).count() as i64,
                    likes: state.post_likes.iter().filter(|(_, p)| p == id).count() as i64,
                };
                (*id, counts)
            })
            .collect())
    }

    async fn list_tags(&self) -> StoreResult<Vec<TagWithCount>> {
        let state = self.state.read().await;
        let mut tags: Vec<TagWithCount> = state
            .tags
            .iter()
            .map(|tag| TagWithCount {
                id: tag.id,
                name: tag.name.clone(),
                post_count: state
                    .posts
                    .iter()
                    .filter(|p| p.tags.iter().any(|t| t.id == tag.id))
                    .count() as i64,
            })
            .collect();
        tags.sort_by(|a, b| b.post_count.cmp(&a.post_count).then(a.name.cmp(&b.name)));
        Ok(tags)
    }

    async fn like_exists(&self, user_id: Uuid, target: LikeTarget) -> StoreResult<bool> {
        if self.stale_like_reads.load(Ordering::SeqCst) {
            return Ok(false);
        }
        let state = self.state.read().await;
        Ok(match target {
            LikeTarget::Post(id) => state.post_likes.contains(&(user_id, id)),
            LikeTarget::Comment(id) => state.comment_likes.contains(&(user_id, id)),
        })
    }

    async fn insert_like(&self, user_id: Uuid, target: LikeTarget) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.require_user(user_id, "likes_user_id_fkey")?;

        let inserted = match target {
            LikeTarget::Post(id) => {
                if !state.post_exists(id) {
                    return Err(StoreError::ForeignKeyViolation(
                        "post_likes_post_id_fkey".to_string(),
                    ));
                }
                state.post_likes.insert((user_id, id))
            }
            LikeTarget::Comment(id) => {
                if !state.comment_exists(id) {
                    return Err(StoreError::ForeignKeyViolation(
                        "comment_likes_comment_id_fkey".to_string(),
                    ));
                }
                state.comment_likes.insert((user_id, id))
            }
        };

        if inserted {
            Ok(())
        } else {
            Err(StoreError::UniqueViolation(format!(
                "{}_likes_user_target_unique",
                target.as_str()
            )))
        }
    }

    async fn delete_like(&self, user_id: Uuid, target: LikeTarget) -> StoreResult<u64> {
        let mut state = self.state.write().await;
        let removed = match target {
            LikeTarget::Post(id) => state.post_likes.remove(&(user_id, id)),
            LikeTarget::Comment(id) => state.comment_likes.remove(&(user_id, id)),
        };
        Ok(removed as u64)
    }

    async fn find_comment(&self, comment_id: Uuid) -> StoreResult<Option<Comment>> {
        let state = self.state.read().await;
        Ok(state.comments.iter().find(|c| c.id == comment_id).cloned())
    }

    async fn insert_comment(&self, new_comment: NewComment) -> StoreResult<Comment> {
        let mut state = self.state.write().await;
        state.require_user(new_comment.user_id, "comments_user_id_fkey")?;
        if !state.post_exists(new_comment.post_id) {
            return Err(StoreError::ForeignKeyViolation(
                "comments_post_id_fkey".to_string(),
            ));
        }
        if let Some(parent_id) = new_comment.parent_id {
            if !state.comment_exists(parent_id) {
                return Err(StoreError::ForeignKeyViolation(
                    "comments_parent_id_fkey".to_string(),
                ));
            }
        }

        let now = Utc::now();
        let comment = Comment {
            id: Uuid::new_v4(),
            user_id: new_comment.user_id,
            post_id: new_comment.post_id,
            parent_id: new_comment.parent_id,
            content: new_comment.content,
            created_at: now,
            updated_at: now,
        };
        state.comments.push(comment.clone());
        Ok(comment)
    }

    async fn update_comment_content(
        &self,
        comment_id: Uuid,
        content: &str,
    ) -> StoreResult<Option<Comment>> {
        let mut state = self.state.write().await;
        Ok(state
            .comments
            .iter_mut()
            .find(|c| c.id == comment_id)
            .map(|comment| {
                comment.content = content.to_string();
                comment.updated_at = Utc::now();
                comment.clone()
            }))
    }

    async fn delete_comment(&self, comment_id: Uuid) -> StoreResult<u64> {
        let mut state = self.state.write().await;
        Ok(state.remove_comments(&[comment_id]))
    }

    async fn delete_replies(&self, parent_id: Uuid) -> StoreResult<u64> {
        let mut state = self.state.write().await;
        let reply_ids: Vec<Uuid> = state
            .comments
            .iter()
            .filter(|c| c.parent_id == Some(parent_id))
            .map(|c| c.id)
            .collect();
        Ok(state.remove_comments(&reply_ids))
    }

    async fn list_top_level_comments(&self, post_id: Uuid) -> StoreResult<Vec<Comment>> {
        let state = self.state.read().await;
        let mut comments: Vec<Comment> = state
            .comments
            .iter()
            .filter(|c| c.post_id == post_id && c.parent_id.is_none())
            .cloned()
            .collect();
        comments.sort_by_key(|c| c.created_at);
        Ok(comments)
    }

    async fn list_replies(&self, parent_ids: &[Uuid]) -> StoreResult<Vec<Comment>> {
        let state = self.state.read().await;
        let mut replies: Vec<Comment> = state
            .comments
            .iter()
            .filter(|c| c.parent_id.map_or(false, |p| parent_ids.contains(&p)))
            .cloned()
            .collect();
        replies.sort_by_key(|c| c.created_at);
        Ok(replies)
    }

    async fn list_user_comments(&self, user_id: Uuid) -> StoreResult<Vec<Comment>> {
        let state = self.state.read().await;
        let mut comments: Vec<Comment> = state
            .comments
            .iter()
            .rev()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(comments)
    }

    async fn query_comments(&self, query: &CommentQuery) -> StoreResult<(Vec<Comment>, i64)> {
        let state = self.state.read().await;
        let mut matching: Vec<Comment> = state
            .comments
            .iter()
            .filter(|c| {
                query
                    .post_id
                    .map_or(true, |p| c.post_id == p && c.parent_id.is_none())
            })
            .filter(|c| query.user_id.map_or(true, |u| c.user_id == u))
            .cloned()
            .collect();
        matching.sort_by_key(|c| c.created_at);

        let total = matching.len() as i64;
        Ok((page(matching, query.limit, query.offset), total))
    }

    async fn comment_counts(
        &self,
        comment_ids: &[Uuid],
    ) -> StoreResult<HashMap<Uuid, CommentCounts>> {
        let state = self.state.read().await;
        Ok(comment_ids
            .iter()
            .map(|id| {
                let counts = CommentCounts {
                    likes: state.comment_likes.iter().filter(|(_, c)| c == id).count() as i64,
                    replies: state
                        .comments
                        .iter()
                        .filter(|c| c.parent_id == Some(*id))
                        .count() as i64,
                };
                (*id, counts)
            })
            .collect())
    }

    async fn insert_notification(
        &self,
        new_notification: NewNotification,
    ) -> StoreResult<Notification> {
        if self.fail_notification_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "notification writes disabled".to_string(),
            ));
        }

        let mut state = self.state.write().await;
        state.require_user(new_notification.user_id, "notifications_user_id_fkey")?;
        state.require_user(
            new_notification.triggered_by,
            "notifications_triggered_by_fkey",
        )?;

        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: new_notification.user_id,
            triggered_by: new_notification.triggered_by,
            kind: new_notification.kind,
            post_id: new_notification.post_id,
            comment_id: new_notification.comment_id,
            message: new_notification.message,
            is_read: false,
            created_at: Utc::now(),
        };
        state.notifications.push(notification.clone());
        Ok(notification)
    }

    async fn find_recent_notification(
        &self,
        key: &NotificationKey,
        since: DateTime<Utc>,
    ) -> StoreResult<Option<Notification>> {
        let state = self.state.read().await;
        Ok(state
            .notifications
            .iter()
            .filter(|n| key.matches(n) && n.created_at >= since)
            .max_by_key(|n| n.created_at)
            .cloned())
    }

    async fn delete_notifications(&self, key: &NotificationKey) -> StoreResult<u64> {
        let mut state = self.state.write().await;
        let before = state.notifications.len();
        state.notifications.retain(|n| !key.matches(n));
        Ok((before - state.notifications.len()) as u64)
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Notification>> {
        let state = self.state.read().await;
        // Reverse insertion order first so equal timestamps stay newest-first
        let mut notifications: Vec<Notification> = state
            .notifications
            .iter()
            .rev()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page(notifications, limit, offset))
    }

    async fn count_notifications(&self, user_id: Uuid, unread_only: bool) -> StoreResult<i64> {
        let state = self.state.read().await;
        Ok(state
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && (!unread_only || !n.is_read))
            .count() as i64)
    }

    async fn mark_notification_read(
        &self,
        notification_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<u64> {
        let mut state = self.state.write().await;
        let mut affected = 0;
        for n in state
            .notifications
            .iter_mut()
            .filter(|n| n.id == notification_id && n.user_id == user_id)
        {
            n.is_read = true;
            affected += 1;
        }
        Ok(affected)
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> StoreResult<u64> {
        let mut state = self.state.write().await;
        let mut affected = 0;
        for n in state
            .notifications
            .iter_mut()
            .filter(|n| n.user_id == user_id && !n.is_read)
        {
            n.is_read = true;
            affected += 1;
        }
        Ok(affected)
    }

    async fn delete_notification(&self, notification_id: Uuid, user_id: Uuid) -> StoreResult<u64> {
        let mut state = self.state.write().await;
        let before = state.notifications.len();
        state
            .notifications
            .retain(|n| !(n.id == notification_id && n.user_id == user_id));
        Ok((before - state.notifications.len()) as u64)
    }
}
