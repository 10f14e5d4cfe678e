use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle status of a post
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum PostStatus {
    #[default]
    Draft,
    Published,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "DRAFT",
            PostStatus::Published => "PUBLISHED",
        }
    }
}

impl FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "DRAFT" => Ok(PostStatus::Draft),
            "PUBLISHED" => Ok(PostStatus::Published),
            other => Err(format!("unknown post status: {}", other)),
        }
    }
}

/// Tag attached to posts (many-to-many)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
}

/// Tag with the number of posts using it
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TagWithCount {
    pub id: Uuid,
    pub name: String,
    pub post_count: i64,
}

/// Post entity - owned by exactly one user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub status: PostStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tags: Vec<Tag>,
    pub image_urls: Vec<String>,
}

/// Comment entity - `parent_id` is None for top-level comments
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn is_reply(&self) -> bool {
        self.parent_id.is_some()
    }
}

/// Public user fields, read-only from this service's perspective
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl UserSummary {
    /// "First Last" when both parts are present, otherwise the username.
    pub fn display_name(&self) -> Option<String> {
        match (non_empty(&self.first_name), non_empty(&self.last_name)) {
            (Some(first), Some(last)) => Some(format!("{} {}", first, last)),
            _ if !self.username.trim().is_empty() => Some(self.username.clone()),
            _ => None,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// What a like (or like-notification) points at
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum LikeTarget {
    Post(Uuid),
    Comment(Uuid),
}

impl LikeTarget {
    pub fn id(&self) -> Uuid {
        match self {
            LikeTarget::Post(id) | LikeTarget::Comment(id) => *id,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LikeTarget::Post(_) => "post",
            LikeTarget::Comment(_) => "comment",
        }
    }

    /// Notification kind produced when this target is liked
    pub fn like_notification_kind(&self) -> NotificationKind {
        match self {
            LikeTarget::Post(_) => NotificationKind::PostLike,
            LikeTarget::Comment(_) => NotificationKind::CommentLike,
        }
    }
}

/// Notification kind enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    /// Someone liked the recipient's post
    PostLike,
    /// Someone commented on the recipient's post
    PostComment,
    /// Someone liked the recipient's comment
    CommentLike,
    /// Someone replied to the recipient's comment
    CommentReply,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::PostLike => "POST_LIKE",
            NotificationKind::PostComment => "POST_COMMENT",
            NotificationKind::CommentLike => "COMMENT_LIKE",
            NotificationKind::CommentReply => "COMMENT_REPLY",
        }
    }

    /// Like notifications are deduplicated within a window and retracted on unlike
    pub fn is_like(&self) -> bool {
        matches!(self, NotificationKind::PostLike | NotificationKind::CommentLike)
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "POST_LIKE" => Ok(NotificationKind::PostLike),
            "POST_COMMENT" => Ok(NotificationKind::PostComment),
            "COMMENT_LIKE" => Ok(NotificationKind::CommentLike),
            "COMMENT_REPLY" => Ok(NotificationKind::CommentReply),
            other => Err(format!("unknown notification kind: {}", other)),
        }
    }
}

/// Core notification model. Only `is_read` is ever mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,

    /// Recipient user ID
    pub user_id: Uuid,

    /// User whose action caused the notification
    pub triggered_by: Uuid,

    pub kind: NotificationKind,

    pub post_id: Option<Uuid>,

    pub comment_id: Option<Uuid>,

    /// Rendered message text
    pub message: String,

    pub is_read: bool,

    pub created_at: DateTime<Utc>,
}

/// Notification enriched for listing
#[derive(Debug, Clone, Serialize)]
pub struct NotificationView {
    #[serde(flatten)]
    pub notification: Notification,
    pub trigger_user: Option<UserSummary>,
}

/// Request to persist a notification
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub triggered_by: Uuid,
    pub kind: NotificationKind,
    pub post_id: Option<Uuid>,
    pub comment_id: Option<Uuid>,
    pub message: String,
}

/// Identifies like-notifications for dedup lookups and retraction.
/// `target` selects the post_id or comment_id column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationKey {
    pub recipient_id: Uuid,
    pub triggered_by: Uuid,
    pub kind: NotificationKind,
    pub target: LikeTarget,
}

impl NotificationKey {
    pub fn for_like(recipient_id: Uuid, triggered_by: Uuid, target: LikeTarget) -> Self {
        Self {
            recipient_id,
            triggered_by,
            kind: target.like_notification_kind(),
            target,
        }
    }

    pub fn matches(&self, notification: &Notification) -> bool {
        let target_matches = match self.target {
            LikeTarget::Post(id) => notification.post_id == Some(id),
            LikeTarget::Comment(id) => notification.comment_id == Some(id),
        };
        notification.user_id == self.recipient_id
            && notification.triggered_by == self.triggered_by
            && notification.kind == self.kind
            && target_matches
    }
}

/// Engagement counts attached to posts
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostCounts {
    pub comments: i64,
    pub likes: i64,
}

/// Engagement counts attached to comments
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommentCounts {
    pub likes: i64,
    pub replies: i64,
}

/// Post as returned by read paths
#[derive(Debug, Clone, Serialize)]
pub struct PostWithCounts {
    #[serde(flatten)]
    pub post: Post,
    pub author: Option<UserSummary>,
    #[serde(rename = "_count")]
    pub counts: PostCounts,
    #[serde(rename = "popularityScore", skip_serializing_if = "Option::is_none")]
    pub popularity_score: Option<f64>,
}

/// Comment as returned by read paths. `replies` is only set on top-level entries.
#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub author: Option<UserSummary>,
    #[serde(rename = "_count")]
    pub counts: CommentCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replies: Option<Vec<CommentView>>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub status: PostStatus,
    pub tags: Vec<String>,
}

/// Partial post update; `tags` replaces the whole set when present
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<PostStatus>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub user_id: Uuid,
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Column ordering supported by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostSortColumn {
    #[default]
    CreatedAt,
    UpdatedAt,
    Title,
}

impl PostSortColumn {
    pub fn as_sql(&self) -> &'static str {
        match self {
            PostSortColumn::CreatedAt => "created_at",
            PostSortColumn::UpdatedAt => "updated_at",
            PostSortColumn::Title => "title",
        }
    }
}

/// Filtered, paginated post lookup
#[derive(Debug, Clone, Default)]
pub struct PostQuery {
    pub status: Option<PostStatus>,
    /// Case-insensitive substring of title or content
    pub search: Option<String>,
    pub tag: Option<String>,
    pub user_id: Option<Uuid>,
    pub sort: PostSortColumn,
    pub order: SortOrder,
    pub limit: i64,
    pub offset: i64,
}

/// Filtered, paginated comment lookup. A `post_id` filter only returns top-level comments.
#[derive(Debug, Clone, Default)]
pub struct CommentQuery {
    pub post_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let total_pages = if limit > 0 { (total + limit - 1) / limit } else { 0 };
        Self {
            page,
            limit,
            total,
            total_pages,
        }
    }

    /// Rows to skip for a 1-based page; saturates instead of overflowing
    pub fn offset(page: i64, limit: i64) -> i64 {
        page.max(1).saturating_sub(1).saturating_mul(limit.max(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(username: &str, first: Option<&str>, last: Option<&str>) -> UserSummary {
        UserSummary {
            id: Uuid::new_v4(),
            username: username.to_string(),
            first_name: first.map(str::to_string),
            last_name: last.map(str::to_string),
            avatar_url: None,
        }
    }

    #[test]
    fn test_display_name_prefers_full_name() {
        assert_eq!(
            user("jdoe", Some("Jane"), Some("Doe")).display_name().as_deref(),
            Some("Jane Doe")
        );
        assert_eq!(
            user("jdoe", Some("Jane"), None).display_name().as_deref(),
            Some("jdoe")
        );
        assert_eq!(
            user("jdoe", Some(""), Some("Doe")).display_name().as_deref(),
            Some("jdoe")
        );
        assert_eq!(user("", None, None).display_name(), None);
    }

    #[test]
    fn test_pagination_total_pages() {
        assert_eq!(Pagination::new(1, 20, 0).total_pages, 0);
        assert_eq!(Pagination::new(1, 20, 20).total_pages, 1);
        assert_eq!(Pagination::new(2, 20, 41).total_pages, 3);
    }

    #[test]
    fn test_pagination_offset_saturates() {
        assert_eq!(Pagination::offset(1, 20), 0);
        assert_eq!(Pagination::offset(3, 20), 40);
        assert_eq!(Pagination::offset(0, 20), 0);
        assert_eq!(Pagination::offset(i64::MAX, 100), i64::MAX);
    }

    #[test]
    fn test_notification_kind_parsing() {
        assert_eq!(
            "post_like".parse::<NotificationKind>().unwrap(),
            NotificationKind::PostLike
        );
        assert_eq!(
            "COMMENT_REPLY".parse::<NotificationKind>().unwrap(),
            NotificationKind::CommentReply
        );
        assert!("FOLLOW".parse::<NotificationKind>().is_err());
        assert!(NotificationKind::CommentLike.is_like());
        assert!(!NotificationKind::PostComment.is_like());
    }

    #[test]
    fn test_notification_key_matches_target_column() {
        let recipient = Uuid::new_v4();
        let actor = Uuid::new_v4();
        let post_id = Uuid::new_v4();
        let key = NotificationKey::for_like(recipient, actor, LikeTarget::Post(post_id));

        let mut notification = Notification {
            id: Uuid::new_v4(),
            user_id: recipient,
            triggered_by: actor,
            kind: NotificationKind::PostLike,
            post_id: Some(post_id),
            comment_id: None,
            message: String::new(),
            is_read: false,
            created_at: Utc::now(),
        };
        assert!(key.matches(&notification));

        notification.kind = NotificationKind::PostComment;
        assert!(!key.matches(&notification));
    }
}
