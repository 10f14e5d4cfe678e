/// Notification engine
///
/// Turns engagement events into notification rows and serves the recipient's
/// inbox. Emission follows one template for every kind:
/// 1. Resolve the recipient from the target's owner (missing target: no-op)
/// 2. Skip self-notifications
/// 3. For like kinds only, skip when an equivalent notification exists inside
///    the dedup window
/// 4. Render the message from the actor's display name and a title excerpt
/// 5. Persist
///
/// Emission and retraction are best-effort. As an `EngagementEventSink` the
/// engine logs and counts failures and never hands them back to the mutation
/// that published the event.
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::EngagementEventSink;
use crate::domain::{
    EngagementEvent, LikeTarget, NewNotification, Notification, NotificationKey,
    NotificationKind, NotificationView, Pagination,
};
use crate::error::Result;
use crate::metrics;
use crate::store::SharedStore;

const FALLBACK_ACTOR_NAME: &str = "Someone";
const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Copy)]
pub struct NotificationSettings {
    /// Lookback for like-notification dedup
    pub dedup_window: Duration,
    /// Max characters of the post title quoted in messages
    pub excerpt_length: usize,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            dedup_window: Duration::hours(24),
            excerpt_length: 50,
        }
    }
}

/// What an emission attempt did
#[derive(Debug, Clone)]
pub enum EmitOutcome {
    Created(Notification),
    Deduplicated,
    SelfInteraction,
    TargetMissing,
}

impl EmitOutcome {
    fn label(&self) -> &'static str {
        match self {
            EmitOutcome::Created(_) => "created",
            EmitOutcome::Deduplicated => "deduplicated",
            EmitOutcome::SelfInteraction => "self_skipped",
            EmitOutcome::TargetMissing => "target_missing",
        }
    }
}

/// A recipient's inbox page
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPage {
    pub notifications: Vec<NotificationView>,
    pub pagination: Pagination,
    pub unread_count: i64,
}

/// Cut `text` to `max_chars` characters, appending "..." when anything was cut
pub fn excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars).collect();
    cut.push_str("...");
    cut
}

/// Everything needed to render and store one notification
struct Draft {
    recipient_id: Uuid,
    kind: NotificationKind,
    post_id: Option<Uuid>,
    comment_id: Option<Uuid>,
    post_title: String,
}

pub struct NotificationEngine {
    store: SharedStore,
    settings: NotificationSettings,
}

impl NotificationEngine {
    pub fn new(store: SharedStore, settings: NotificationSettings) -> Self {
        Self { store, settings }
    }

    // ---- emission ----

    /// Like on a post or comment; deduplicated within the window
    pub async fn notify_like(&self, actor_id: Uuid, target: LikeTarget) -> Result<EmitOutcome> {
        let draft = match target {
            LikeTarget::Post(post_id) => {
                let Some(post) = self.store.find_post(post_id).await? else {
                    return Ok(EmitOutcome::TargetMissing);
                };
                Draft {
                    recipient_id: post.user_id,
                    kind: NotificationKind::PostLike,
                    post_id: Some(post.id),
                    comment_id: None,
                    post_title: post.title,
                }
            }
            LikeTarget::Comment(comment_id) => {
                let Some(comment) = self.store.find_comment(comment_id).await? else {
                    return Ok(EmitOutcome::TargetMissing);
                };
                let Some(post) = self.store.find_post(comment.post_id).await? else {
                    return Ok(EmitOutcome::TargetMissing);
                };
                Draft {
                    recipient_id: comment.user_id,
                    kind: NotificationKind::CommentLike,
                    post_id: Some(post.id),
                    comment_id: Some(comment.id),
                    post_title: post.title,
                }
            }
        };

        if draft.recipient_id == actor_id {
            return Ok(EmitOutcome::SelfInteraction);
        }

        let key = NotificationKey::for_like(draft.recipient_id, actor_id, target);
        let since = Utc::now() - self.settings.dedup_window;
        if let Some(existing) = self.store.find_recent_notification(&key, since).await? {
            debug!(
                notification_id = %existing.id,
                kind = key.kind.as_str(),
                "like notification inside dedup window; skipping"
            );
            return Ok(EmitOutcome::Deduplicated);
        }

        self.persist(actor_id, draft).await
    }

    /// New top-level comment; never deduplicated
    pub async fn notify_comment(
        &self,
        actor_id: Uuid,
        post_id: Uuid,
        comment_id: Uuid,
    ) -> Result<EmitOutcome> {
        let Some(post) = self.store.find_post(post_id).await? else {
            return Ok(EmitOutcome::TargetMissing);
        };
        if post.user_id == actor_id {
            return Ok(EmitOutcome::SelfInteraction);
        }

        self.persist(
            actor_id,
            Draft {
                recipient_id: post.user_id,
                kind: NotificationKind::PostComment,
                post_id: Some(post.id),
                comment_id: Some(comment_id),
                post_title: post.title,
            },
        )
        .await
    }

    /// Reply to a comment; goes to the parent's author, never deduplicated
    pub async fn notify_reply(
        &self,
        actor_id: Uuid,
        parent_id: Uuid,
        reply_id: Uuid,
    ) -> Result<EmitOutcome> {
        let Some(parent) = self.store.find_comment(parent_id).await? else {
            return Ok(EmitOutcome::TargetMissing);
        };
        if parent.user_id == actor_id {
            return Ok(EmitOutcome::SelfInteraction);
        }
        let Some(post) = self.store.find_post(parent.post_id).await? else {
            return Ok(EmitOutcome::TargetMissing);
        };

        self.persist(
            actor_id,
            Draft {
                recipient_id: parent.user_id,
                kind: NotificationKind::CommentReply,
                post_id: Some(post.id),
                comment_id: Some(reply_id),
                post_title: post.title,
            },
        )
        .await
    }

    /// Remove the like-notification an actor caused on a target, regardless
    /// of its age. Returns the number of rows removed.
    pub async fn retract_like(&self, actor_id: Uuid, target: LikeTarget) -> Result<u64> {
        let recipient_id = match target {
            LikeTarget::Post(id) => self.store.find_post(id).await?.map(|p| p.user_id),
            LikeTarget::Comment(id) => self.store.find_comment(id).await?.map(|c| c.user_id),
        };
        let Some(recipient_id) = recipient_id else {
            return Ok(0);
        };

        let key = NotificationKey::for_like(recipient_id, actor_id, target);
        let removed = self.store.delete_notifications(&key).await?;
        if removed > 0 {
            metrics::record_notification(key.kind.as_str(), "retracted");
            debug!(
                recipient_id = %recipient_id,
                actor_id = %actor_id,
                kind = key.kind.as_str(),
                removed,
                "like notification retracted"
            );
        }
        Ok(removed)
    }

    async fn persist(&self, actor_id: Uuid, draft: Draft) -> Result<EmitOutcome> {
        let actor_name = self
            .store
            .find_user(actor_id)
            .await?
            .and_then(|user| user.display_name())
            .unwrap_or_else(|| FALLBACK_ACTOR_NAME.to_string());
        let title = excerpt(&draft.post_title, self.settings.excerpt_length);

        let message = match draft.kind {
            NotificationKind::PostLike => format!("{} liked your post: \"{}\"", actor_name, title),
            NotificationKind::PostComment => {
                format!("{} commented on your post: \"{}\"", actor_name, title)
            }
            NotificationKind::CommentLike => {
                format!("{} liked your comment on \"{}\"", actor_name, title)
            }
            NotificationKind::CommentReply => {
                format!("{} replied to your comment on \"{}\"", actor_name, title)
            }
        };

        let notification = self
            .store
            .insert_notification(NewNotification {
                user_id: draft.recipient_id,
                triggered_by: actor_id,
                kind: draft.kind,
                post_id: draft.post_id,
                comment_id: draft.comment_id,
                message,
            })
            .await?;

        info!(
            notification_id = %notification.id,
            recipient_id = %notification.user_id,
            kind = notification.kind.as_str(),
            "notification created"
        );
        Ok(EmitOutcome::Created(notification))
    }

    async fn dispatch(&self, event: EngagementEvent) -> Result<()> {
        let actor_id = event.actor_id();
        let (kind, outcome) = match event {
            EngagementEvent::PostLiked { post_id, .. } => (
                NotificationKind::PostLike,
                self.notify_like(actor_id, LikeTarget::Post(post_id)).await?,
            ),
            EngagementEvent::CommentLiked { comment_id, .. } => (
                NotificationKind::CommentLike,
                self.notify_like(actor_id, LikeTarget::Comment(comment_id))
                    .await?,
            ),
            EngagementEvent::CommentCreated {
                post_id,
                comment_id,
                ..
            } => (
                NotificationKind::PostComment,
                self.notify_comment(actor_id, post_id, comment_id).await?,
            ),
            EngagementEvent::ReplyCreated {
                parent_id,
                reply_id,
                ..
            } => (
                NotificationKind::CommentReply,
                self.notify_reply(actor_id, parent_id, reply_id).await?,
            ),
            EngagementEvent::PostUnliked { post_id, .. } => {
                self.retract_like(actor_id, LikeTarget::Post(post_id))
                    .await?;
                return Ok(());
            }
            EngagementEvent::CommentUnliked { comment_id, .. } => {
                self.retract_like(actor_id, LikeTarget::Comment(comment_id))
                    .await?;
                return Ok(());
            }
        };

        metrics::record_notification(kind.as_str(), outcome.label());
        Ok(())
    }

    // ---- inbox ----

    /// Newest first; total and unread count are independent of the page
    pub async fn list(&self, user_id: Uuid, page: i64, limit: i64) -> Result<NotificationPage> {
        let page = page.max(1);
        let limit = if limit <= 0 {
            DEFAULT_PAGE_SIZE
        } else {
            limit.min(MAX_PAGE_SIZE)
        };
        let offset = Pagination::offset(page, limit);

        let notifications = self
            .store
            .list_notifications(user_id, limit, offset)
            .await?;
        let total = self.store.count_notifications(user_id, false).await?;
        let unread_count = self.store.count_notifications(user_id, true).await?;

        let mut trigger_ids: Vec<Uuid> = notifications.iter().map(|n| n.triggered_by).collect();
        trigger_ids.sort();
        trigger_ids.dedup();
        let users = self.store.find_users(&trigger_ids).await?;

        let notifications = notifications
            .into_iter()
            .map(|notification| NotificationView {
                trigger_user: users.get(&notification.triggered_by).cloned(),
                notification,
            })
            .collect();

        Ok(NotificationPage {
            notifications,
            pagination: Pagination::new(page, limit, total),
            unread_count,
        })
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<i64> {
        Ok(self.store.count_notifications(user_id, true).await?)
    }

    /// Zero rows when the notification is missing or belongs to someone else
    pub async fn mark_read(&self, notification_id: Uuid, user_id: Uuid) -> Result<u64> {
        Ok(self
            .store
            .mark_notification_read(notification_id, user_id)
            .await?)
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64> {
        let updated = self.store.mark_all_notifications_read(user_id).await?;
        debug!(user_id = %user_id, updated, "marked notifications read");
        Ok(updated)
    }

    /// Zero rows when the notification is missing or belongs to someone else
    pub async fn delete(&self, notification_id: Uuid, user_id: Uuid) -> Result<u64> {
        Ok(self
            .store
            .delete_notification(notification_id, user_id)
            .await?)
    }
}

#[async_trait]
impl EngagementEventSink for NotificationEngine {
    async fn publish(&self, event: EngagementEvent) {
        if let Err(err) = self.dispatch(event).await {
            let kind = match event {
                EngagementEvent::PostLiked { .. } | EngagementEvent::PostUnliked { .. } => {
                    NotificationKind::PostLike
                }
                EngagementEvent::CommentLiked { .. } | EngagementEvent::CommentUnliked { .. } => {
                    NotificationKind::CommentLike
                }
                EngagementEvent::CommentCreated { .. } => NotificationKind::PostComment,
                EngagementEvent::ReplyCreated { .. } => NotificationKind::CommentReply,
            };
            metrics::record_notification(kind.as_str(), "failed");
            warn!(
                event_type = event.event_type(),
                actor_id = %event.actor_id(),
                error = %err,
                "notification side effect failed"
            );
        }
    }
}
