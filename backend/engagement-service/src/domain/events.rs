//! Domain events committed by engagement mutations.
//!
//! Mutation sites publish these instead of calling notification logic
//! directly; a sink decides what to do with them.
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::models::LikeTarget;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum EngagementEvent {
    PostLiked {
        post_id: Uuid,
        actor_id: Uuid,
    },
    PostUnliked {
        post_id: Uuid,
        actor_id: Uuid,
    },
    CommentLiked {
        comment_id: Uuid,
        actor_id: Uuid,
    },
    CommentUnliked {
        comment_id: Uuid,
        actor_id: Uuid,
    },
    CommentCreated {
        post_id: Uuid,
        comment_id: Uuid,
        actor_id: Uuid,
    },
    ReplyCreated {
        parent_id: Uuid,
        reply_id: Uuid,
        actor_id: Uuid,
    },
}

impl EngagementEvent {
    pub fn liked(target: LikeTarget, actor_id: Uuid) -> Self {
        match target {
            LikeTarget::Post(post_id) => EngagementEvent::PostLiked { post_id, actor_id },
            LikeTarget::Comment(comment_id) => EngagementEvent::CommentLiked {
                comment_id,
                actor_id,
            },
        }
    }

    pub fn unliked(target: LikeTarget, actor_id: Uuid) -> Self {
        match target {
            LikeTarget::Post(post_id) => EngagementEvent::PostUnliked { post_id, actor_id },
            LikeTarget::Comment(comment_id) => EngagementEvent::CommentUnliked {
                comment_id,
                actor_id,
            },
        }
    }

    pub fn actor_id(&self) -> Uuid {
        match self {
            EngagementEvent::PostLiked { actor_id, .. }
            | EngagementEvent::PostUnliked { actor_id, .. }
            | EngagementEvent::CommentLiked { actor_id, .. }
            | EngagementEvent::CommentUnliked { actor_id, .. }
            | EngagementEvent::CommentCreated { actor_id, .. }
            | EngagementEvent::ReplyCreated { actor_id, .. } => *actor_id,
        }
    }

    /// Dotted name used for logs and metrics labels
    pub fn event_type(&self) -> &'static str {
        match self {
            EngagementEvent::PostLiked { .. } => "post.liked",
            EngagementEvent::PostUnliked { .. } => "post.unliked",
            EngagementEvent::CommentLiked { .. } => "comment.liked",
            EngagementEvent::CommentUnliked { .. } => "comment.unliked",
            EngagementEvent::CommentCreated { .. } => "comment.created",
            EngagementEvent::ReplyCreated { .. } => "comment.reply_created",
        }
    }
}
