//! Shared fixtures for engagement-service integration tests
#![allow(dead_code)]

use std::sync::Arc;

use engagement_service::domain::{Comment, PostStatus, PostWithCounts, UserSummary};
use engagement_service::services::NotificationSettings;
use engagement_service::store::MemoryStore;
use engagement_service::Engagement;
use uuid::Uuid;

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub engagement: Engagement,
}

pub fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let engagement = Engagement::new(store.clone(), NotificationSettings::default());
    Fixture { store, engagement }
}

impl Fixture {
    pub async fn user(&self, username: &str) -> UserSummary {
        self.named_user(username, None, None).await
    }

    pub async fn named_user(
        &self,
        username: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> UserSummary {
        let user = UserSummary {
            id: Uuid::new_v4(),
            username: username.to_string(),
            first_name: first_name.map(str::to_string),
            last_name: last_name.map(str::to_string),
            avatar_url: None,
        };
        self.store.insert_user(user.clone()).await;
        user
    }

    pub async fn post(&self, author: &UserSummary, title: &str) -> PostWithCounts {
        self.engagement
            .posts
            .create_post(
                author.id,
                title,
                "body",
                PostStatus::Published,
                vec![],
            )
            .await
            .expect("create post")
    }

    pub async fn comment(&self, author: &UserSummary, post_id: Uuid, content: &str) -> Comment {
        self.engagement
            .threads
            .create_comment(author.id, post_id, content, None)
            .await
            .expect("create comment")
            .comment
    }

    pub async fn reply(
        &self,
        author: &UserSummary,
        post_id: Uuid,
        parent_id: Uuid,
        content: &str,
    ) -> Comment {
        self.engagement
            .threads
            .create_comment(author.id, post_id, content, Some(parent_id))
            .await
            .expect("create reply")
            .comment
    }
}
