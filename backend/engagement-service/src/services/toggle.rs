use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::SharedEventSink;
use crate::domain::{EngagementEvent, LikeTarget};
use crate::error::{AppError, Result};
use crate::metrics;
use crate::store::{SharedStore, StoreError};

/// Result of a like toggle, as returned to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToggleOutcome {
    pub message: String,
    pub liked: bool,
}

impl ToggleOutcome {
    fn new(target: LikeTarget, liked: bool) -> Self {
        let noun = match target {
            LikeTarget::Post(_) => "Post",
            LikeTarget::Comment(_) => "Comment",
        };
        let verb = if liked { "liked" } else { "unliked" };
        Self {
            message: format!("{} {} successfully", noun, verb),
            liked,
        }
    }
}

/// Idempotent like/unlike for posts and comments.
///
/// The store's (user, target) uniqueness constraint is the only concurrency
/// guard. A duplicate insert means a concurrent toggle already liked the
/// target, so it is reported as liked without publishing a second event.
pub struct ToggleEngine {
    store: SharedStore,
    events: SharedEventSink,
}

impl ToggleEngine {
    pub fn new(store: SharedStore, events: SharedEventSink) -> Self {
        Self { store, events }
    }

    pub async fn toggle_like(&self, actor_id: Uuid, target: LikeTarget) -> Result<ToggleOutcome> {
        self.ensure_target_exists(target).await?;

        if self.store.like_exists(actor_id, target).await? {
            let removed = self.store.delete_like(actor_id, target).await?;
            metrics::record_like_toggle(target.as_str(), "unliked");
            info!(
                actor_id = %actor_id,
                target = target.as_str(),
                target_id = %target.id(),
                removed,
                "like removed"
            );
            self.events
                .publish(EngagementEvent::unliked(target, actor_id))
                .await;
            return Ok(ToggleOutcome::new(target, false));
        }

        match self.store.insert_like(actor_id, target).await {
            Ok(()) => {
                metrics::record_like_toggle(target.as_str(), "liked");
                info!(
                    actor_id = %actor_id,
                    target = target.as_str(),
                    target_id = %target.id(),
                    "like added"
                );
                self.events
                    .publish(EngagementEvent::liked(target, actor_id))
                    .await;
                Ok(ToggleOutcome::new(target, true))
            }
            Err(StoreError::UniqueViolation(constraint)) => {
                metrics::record_like_toggle(target.as_str(), "race");
                warn!(
                    actor_id = %actor_id,
                    target = target.as_str(),
                    target_id = %target.id(),
                    constraint = %constraint,
                    "concurrent like already committed; treating as liked"
                );
                Ok(ToggleOutcome::new(target, true))
            }
            Err(StoreError::ForeignKeyViolation(constraint))
                if constraint.ends_with("user_id_fkey") =>
            {
                Err(AppError::NotFound(format!("User {} not found", actor_id)))
            }
            Err(StoreError::ForeignKeyViolation(_)) => Err(AppError::NotFound(format!(
                "{} {} not found",
                target.as_str(),
                target.id()
            ))),
            Err(err) => Err(err.into()),
        }
    }

    async fn ensure_target_exists(&self, target: LikeTarget) -> Result<()> {
        let exists = match target {
            LikeTarget::Post(id) => self.store.find_post(id).await?.is_some(),
            LikeTarget::Comment(id) => self.store.find_comment(id).await?.is_some(),
        };
        if exists {
            Ok(())
        } else {
            Err(AppError::NotFound(format!(
                "{} {} not found",
                target.as_str(),
                target.id()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewPost, UserSummary};
    use crate::services::EngagementEventSink;
    use crate::store::{EngagementStore, MemoryStore};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<EngagementEvent>>,
    }

    #[async_trait]
    impl EngagementEventSink for RecordingSink {
        async fn publish(&self, event: EngagementEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[tokio::test]
    async fn test_toggle_publishes_liked_then_unliked() {
        let store = Arc::new(MemoryStore::new());
        let actor = UserSummary {
            id: Uuid::new_v4(),
            username: "reader".into(),
            first_name: None,
            last_name: None,
            avatar_url: None,
        };
        store.insert_user(actor.clone()).await;
        let post = store
            .insert_post(NewPost {
                user_id: actor.id,
                title: "hello".into(),
                content: "world".into(),
                status: Default::default(),
                tags: vec![],
            })
            .await
            .unwrap();

        let sink = Arc::new(RecordingSink::default());
        let engine = ToggleEngine::new(store.clone(), sink.clone());
        let target = LikeTarget::Post(post.id);

        let first = engine.toggle_like(actor.id, target).await.unwrap();
        assert!(first.liked);
        assert_eq!(first.message, "Post liked successfully");
        let second = engine.toggle_like(actor.id, target).await.unwrap();
        assert!(!second.liked);

        let events = sink.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                EngagementEvent::liked(target, actor.id),
                EngagementEvent::unliked(target, actor.id)
            ]
        );
    }

    #[tokio::test]
    async fn test_toggle_by_unknown_user_names_the_user() {
        let store = Arc::new(MemoryStore::new());
        let author = UserSummary {
            id: Uuid::new_v4(),
            username: "author".into(),
            first_name: None,
            last_name: None,
            avatar_url: None,
        };
        store.insert_user(author.clone()).await;
        let post = store
            .insert_post(NewPost {
                user_id: author.id,
                title: "hello".into(),
                content: "world".into(),
                status: Default::default(),
                tags: vec![],
            })
            .await
            .unwrap();

        let sink = Arc::new(RecordingSink::default());
        let engine = ToggleEngine::new(store.clone(), sink.clone());
        let ghost = Uuid::new_v4();

        let err = engine
            .toggle_like(ghost, LikeTarget::Post(post.id))
            .await
            .unwrap_err();
        match err {
            AppError::NotFound(message) => {
                assert_eq!(message, format!("User {} not found", ghost));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(sink.events.lock().unwrap().is_empty());
        assert_eq!(store.like_rows(LikeTarget::Post(post.id)).await, 0);
    }

    #[tokio::test]
    async fn test_toggle_missing_target_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        let engine = ToggleEngine::new(store, Arc::new(RecordingSink::default()));

        let err = engine
            .toggle_like(Uuid::new_v4(), LikeTarget::Comment(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
